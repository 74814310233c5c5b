//! Tool dispatch and synthesis integration tests
//!
//! Provider clients point at unroutable local addresses, so every network
//! path fails fast and the tests exercise validation short-circuits,
//! deferred image capture, degradation, and the synthesizer contract
//! offline.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use kisan_gateway::ai::GenerativeClient;
use kisan_gateway::dashboard::{DashboardHistory, LoadingState, UiBridge, UiEvent};
use kisan_gateway::mandi::{MandiClient, MandiRecord};
use kisan_gateway::session::wire::{FunctionCall, ToolCallRequest};
use kisan_gateway::tools::{
    self, MarketData, NO_INFORMATION_SUMMARY, ToolDispatcher, ToolResult, synthesize,
};

fn build_dispatcher(ui: UiBridge) -> (Arc<Mutex<DashboardHistory>>, ToolDispatcher) {
    let mandi = Arc::new(MandiClient::new(
        "test-key",
        "http://127.0.0.1:9/today",
        "http://127.0.0.1:9/historical",
    ));
    let ai = Arc::new(GenerativeClient::new("test-key").with_base_url("http://127.0.0.1:9"));
    let history = Arc::new(Mutex::new(DashboardHistory::new()));
    let dispatcher = ToolDispatcher::new(mandi, ai, Arc::clone(&history), ui);
    (history, dispatcher)
}

fn call(name: &str, args: Option<Value>) -> FunctionCall {
    FunctionCall {
        id: Some(format!("call-{name}")),
        name: name.to_string(),
        args,
    }
}

fn batch(function_calls: Vec<FunctionCall>) -> ToolCallRequest {
    ToolCallRequest { function_calls }
}

fn loading_events(events: &mut tokio::sync::mpsc::UnboundedReceiver<UiEvent>) -> Vec<LoadingState> {
    let mut states = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let UiEvent::Loading(state) = event {
            states.push(state);
        }
    }
    states
}

fn record(modal: &str) -> MandiRecord {
    MandiRecord {
        state: "Haryana".to_string(),
        market: "Gurgaon".to_string(),
        commodity: "Onion".to_string(),
        arrival_date: "01/07/2025".to_string(),
        modal_price: modal.to_string(),
        ..MandiRecord::default()
    }
}

#[tokio::test]
async fn unknown_tool_yields_error_result_and_batch_completes() {
    let (ui, mut events) = UiBridge::new();
    let (history, dispatcher) = build_dispatcher(ui);

    let request = batch(vec![call("foo", None)]);
    let result = dispatcher.dispatch(&request, &tools::ToolContext::default()).await;

    assert_eq!(result.response.result.summary, "Unknown tool: foo");
    assert!(result.response.result.details.is_empty());
    assert_eq!(history.lock().unwrap().len(), 1);

    let loading = loading_events(&mut events);
    assert_eq!(loading.first().unwrap().tool_name.as_deref(), Some("foo"));
    assert!(loading.first().unwrap().active);
    assert!(!loading.last().unwrap().active);
}

#[tokio::test]
async fn malformed_call_short_circuits_without_stopping_the_batch() {
    let (ui, _events) = UiBridge::new();
    let (_history, dispatcher) = build_dispatcher(ui);

    // First call is missing its required argument; second is well-formed
    // for the arg-validation layer but fails in execution (empty image).
    let request = batch(vec![
        call("get_market_data", Some(json!({"state": "Haryana"}))),
        call("diagnose_crop_disease", Some(json!({"image": ""}))),
    ]);
    let result = dispatcher.dispatch(&request, &tools::ToolContext::default()).await;

    let details = &result.response.result.details;
    assert_eq!(
        details["market"]["error"],
        "Missing or invalid 'commodityName' argument for get_market_data."
    );
    assert_eq!(details["disease"]["error"], "No image provided.");

    let summary = &result.response.result.summary;
    assert!(summary.contains("Missing or invalid 'commodityName'"));
    assert!(summary.contains("No image provided."));
}

#[tokio::test]
async fn cancelled_image_request_contributes_no_result() {
    let (ui, mut events, mut images) = UiBridge::with_image_capture();
    let (_history, dispatcher) = build_dispatcher(ui);

    // The frontend dismisses the capture modal without supplying an image
    tokio::spawn(async move {
        let request = images.recv().await.unwrap();
        drop(request);
    });

    let request = batch(vec![call("diagnose_crop_disease", None)]);
    let result = dispatcher.dispatch(&request, &tools::ToolContext::default()).await;

    assert_eq!(result.response.result.summary, NO_INFORMATION_SUMMARY);
    assert!(!result.response.result.details.contains_key("disease"));

    let loading = loading_events(&mut events);
    assert!(!loading.last().unwrap().active);
}

#[tokio::test]
async fn supplied_image_runs_diagnosis_inline() {
    let (ui, _events, mut images) = UiBridge::with_image_capture();
    let (_history, dispatcher) = build_dispatcher(ui);

    tokio::spawn(async move {
        let request = images.recv().await.unwrap();
        request.supply("data:image/png;base64,QUJD".to_string());
    });

    let ctx = tools::ToolContext {
        language: "en-IN".to_string(),
        history: Vec::new(),
    };
    let request = batch(vec![call("diagnose_crop_disease", None)]);
    let result = dispatcher.dispatch(&request, &ctx).await;

    // The AI endpoint is unreachable, so the tool degrades to its fixed
    // consult-an-officer diagnosis; the call still contributes a result.
    let details = &result.response.result.details;
    assert_eq!(details["disease"]["diseaseName"], "Unknown Disease");
    assert!(
        result
            .response
            .result
            .summary
            .contains("Disease diagnosis: Could not identify.")
    );
}

#[tokio::test]
async fn todays_market_query_skips_ai_and_returns_records_directly() {
    let (ui, _events) = UiBridge::new();
    let (history, dispatcher) = build_dispatcher(ui);

    // No date argument: defaults to today, whose path never calls the AI
    // summarizer. The mandi endpoint is unreachable, so records are empty.
    let request = batch(vec![call(
        "get_market_data",
        Some(json!({"commodityName": "Onion"})),
    )]);
    let result = dispatcher.dispatch(&request, &tools::ToolContext::default()).await;

    assert_eq!(result.response.result.summary, "Market data available.");
    assert_eq!(result.response.result.details["market"]["records"], json!([]));
    assert_eq!(history.lock().unwrap().len(), 1);
}

#[test]
fn market_stats_follow_the_fixed_label_order() {
    let calls = vec![call("get_market_data", None)];
    let results = vec![ToolResult::Market(MarketData {
        records: vec![record("1000"), record("1200"), record("1100")],
        summary: "Prices are steady.".to_string(),
        ..MarketData::default()
    })];

    let result = synthesize(&calls, &results);
    let stats = &result.response.result.stats;

    assert_eq!(stats.len(), 4);
    assert_eq!(stats[0].label, "Minimum Price");
    assert_eq!(stats[0].value, json!(1000.0));
    assert_eq!(stats[1].label, "Maximum Price");
    assert_eq!(stats[1].value, json!(1200.0));
    assert_eq!(stats[2].label, "Average Price");
    assert_eq!(stats[2].value, json!(1100));
    assert_eq!(stats[3].label, "Records");
    assert_eq!(stats[3].value, json!(3));
}

#[test]
fn unparseable_prices_are_excluded_from_stats_but_counted() {
    let calls = vec![call("get_market_data", None)];
    let results = vec![ToolResult::Market(MarketData {
        records: vec![record("1000"), record("n/a")],
        ..MarketData::default()
    })];

    let stats = synthesize(&calls, &results).response.result.stats;
    assert_eq!(stats[0].value, json!(1000.0));
    assert_eq!(stats[3].value, json!(2));
}

#[test]
fn synthesis_is_idempotent() {
    let calls = vec![
        call("get_market_data", None),
        call("get_government_schemes", None),
    ];
    let results = vec![
        ToolResult::Market(MarketData {
            records: vec![record("1000")],
            summary: "Sell now.".to_string(),
            chart_type: Some("bar".to_string()),
            chart_data: Some(json!([{"market": "Gurgaon", "modal": 1000.0}])),
            ..MarketData::default()
        }),
        ToolResult::Schemes(kisan_gateway::tools::SchemesResult {
            summary: "One scheme found.".to_string(),
            schemes: Vec::new(),
        }),
    ];

    let first = synthesize(&calls, &results);
    let second = synthesize(&calls, &results);
    assert_eq!(first, second);
}

#[test]
fn bucket_assignment_ignores_call_order() {
    let market = ToolResult::Market(MarketData {
        records: vec![record("1000")],
        summary: "Market summary.".to_string(),
        ..MarketData::default()
    });
    let schemes = ToolResult::Schemes(kisan_gateway::tools::SchemesResult {
        summary: "Scheme summary.".to_string(),
        schemes: Vec::new(),
    });

    let forward = synthesize(
        &[call("get_market_data", None), call("get_government_schemes", None)],
        &[market.clone(), schemes.clone()],
    );
    let reversed = synthesize(
        &[call("get_government_schemes", None), call("get_market_data", None)],
        &[schemes, market],
    );

    // Same buckets either way, and the summary keeps the fixed order:
    // market before schemes
    assert_eq!(
        forward.response.result.details.keys().collect::<Vec<_>>(),
        reversed.response.result.details.keys().collect::<Vec<_>>()
    );
    assert_eq!(
        forward.response.result.summary,
        "Market summary.\nScheme summary."
    );
    assert_eq!(
        reversed.response.result.summary,
        "Market summary.\nScheme summary."
    );
}

#[test]
fn charts_come_only_from_market_and_comparison_buckets() {
    let calls = vec![
        call("get_market_data", None),
        call("compare_state_market_data", None),
        call("get_government_schemes", None),
    ];
    let results = vec![
        ToolResult::Market(MarketData {
            records: vec![record("1000")],
            chart_type: Some("bar".to_string()),
            chart_data: Some(json!([{"market": "Gurgaon", "modal": 1000.0}])),
            ..MarketData::default()
        }),
        ToolResult::Comparison(MarketData {
            records: vec![record("900")],
            chart_type: Some("bar".to_string()),
            chart_data: Some(json!([{"state": "Haryana", "modal": 900.0}])),
            ..MarketData::default()
        }),
        ToolResult::Schemes(kisan_gateway::tools::SchemesResult::default()),
    ];

    let charts = synthesize(&calls, &results).response.result.charts;
    assert_eq!(charts.len(), 2);
    assert_eq!(charts[0].title, "Market Data");
    assert_eq!(charts[1].title, "Comparison Data");
}
