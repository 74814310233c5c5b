//! Tool result synthesis
//!
//! Merges one batch's heterogeneous tool outputs into a single
//! display-ready structure of stable shape: a newline-joined summary in
//! fixed bucket order (disease, market, comparison, schemes), charts from
//! the market and comparison buckets, price stats from market records, and
//! per-bucket raw details. Deterministic and total: missing data degrades
//! to omitted sections, never to an error.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::session::wire::FunctionCall;
use crate::tools::{
    COMPARE_STATE_MARKET_DATA, DIAGNOSE_CROP_DISEASE, GET_GOVERNMENT_SCHEMES, GET_MARKET_DATA,
    MarketData, ToolResult,
};

/// Scheduling directive attached to the tool response
const SCHEDULING_INTERRUPT: &str = "INTERRUPT";

/// Summary used when no bucket contributed anything actionable
pub const NO_INFORMATION_SUMMARY: &str = "No actionable information found.";

/// One chart derived from a bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartEntry {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub data: Value,
    pub title: String,
}

/// One labelled stat tile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatEntry {
    pub label: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl StatEntry {
    fn new(label: &str, value: Value, icon: &str, color: &str) -> Self {
        Self {
            label: label.to_string(),
            value,
            icon: Some(icon.to_string()),
            color: Some(color.to_string()),
        }
    }
}

/// The merged, display-ready payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedPayload {
    pub summary: String,
    pub charts: Vec<ChartEntry>,
    pub stats: Vec<StatEntry>,
    pub details: Map<String, Value>,
}

/// Payload plus its scheduling directive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedResponse {
    pub result: SynthesizedPayload,
    pub scheduling: String,
}

/// The canonical tool response and dashboard entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedResult {
    pub id: String,
    pub name: String,
    pub response: SynthesizedResponse,
}

impl SynthesizedResult {
    /// A bare result carrying only a summary (histories, tests)
    #[must_use]
    pub fn with_summary(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: "synthesized_result".to_string(),
            response: SynthesizedResponse {
                result: SynthesizedPayload {
                    summary: summary.into(),
                    charts: Vec::new(),
                    stats: Vec::new(),
                    details: Map::new(),
                },
                scheduling: SCHEDULING_INTERRUPT.to_string(),
            },
        }
    }
}

/// Merge one batch's calls and results
///
/// Results pair with calls by position; the bucket a result lands in is
/// decided solely by its call's tool name. Unknown tool names contribute
/// their error text to the summary but populate no bucket.
#[must_use]
pub fn synthesize(calls: &[FunctionCall], results: &[ToolResult]) -> SynthesizedResult {
    let mut disease = None;
    let mut market = None;
    let mut comparison = None;
    let mut schemes = None;
    let mut unknown_errors: Vec<String> = Vec::new();

    for (call, result) in calls.iter().zip(results) {
        match call.name.as_str() {
            GET_MARKET_DATA => market = Some(result),
            COMPARE_STATE_MARKET_DATA => comparison = Some(result),
            GET_GOVERNMENT_SCHEMES => schemes = Some(result),
            DIAGNOSE_CROP_DISEASE => disease = Some(result),
            _ => {
                if let ToolResult::Error(e) = result {
                    unknown_errors.push(e.error.clone());
                }
            }
        }
    }

    let mut parts: Vec<String> = Vec::new();
    let mut charts: Vec<ChartEntry> = Vec::new();
    let mut stats: Vec<StatEntry> = Vec::new();
    let mut details = Map::new();

    if let Some(result) = disease {
        details.insert("disease".to_string(), result.to_detail());
        parts.push(disease_summary(result));
    }

    if let Some(result) = market {
        details.insert("market".to_string(), result.to_detail());
        if let ToolResult::Market(data) = result {
            push_chart(&mut charts, data, "Market Data");
            push_stats(&mut stats, data);
        }
        parts.push(data_summary(result, "Market data available."));
    }

    if let Some(result) = comparison {
        details.insert("comparison".to_string(), result.to_detail());
        if let ToolResult::Comparison(data) = result {
            push_chart(&mut charts, data, "Comparison Data");
        }
        parts.push(data_summary(result, "Comparison data available."));
    }

    if let Some(result) = schemes {
        details.insert("schemes".to_string(), result.to_detail());
        parts.push(schemes_summary(result));
    }

    parts.extend(unknown_errors);

    let summary = if parts.is_empty() {
        NO_INFORMATION_SUMMARY.to_string()
    } else {
        parts.join("\n")
    };

    SynthesizedResult {
        id: calls
            .first()
            .and_then(|call| call.id.clone())
            .unwrap_or_else(|| "synthesized".to_string()),
        name: "synthesized_result".to_string(),
        response: SynthesizedResponse {
            result: SynthesizedPayload {
                summary,
                charts,
                stats,
                details,
            },
            scheduling: SCHEDULING_INTERRUPT.to_string(),
        },
    }
}

fn disease_summary(result: &ToolResult) -> String {
    match result {
        ToolResult::Diagnosis(d) if !d.cause.is_empty() => {
            format!("🦠 Disease diagnosis: {}.", d.cause)
        }
        ToolResult::Error(e) => e.error.clone(),
        _ => "No disease info.".to_string(),
    }
}

fn data_summary(result: &ToolResult, fallback: &str) -> String {
    match result {
        ToolResult::Market(data) | ToolResult::Comparison(data) => {
            if !data.summary.is_empty() {
                data.summary.clone()
            } else if let Some(error) = &data.error {
                error.clone()
            } else {
                fallback.to_string()
            }
        }
        ToolResult::Error(e) => e.error.clone(),
        _ => fallback.to_string(),
    }
}

fn schemes_summary(result: &ToolResult) -> String {
    match result {
        ToolResult::Schemes(s) if !s.summary.is_empty() => s.summary.clone(),
        ToolResult::Error(e) => e.error.clone(),
        _ => "Scheme info available.".to_string(),
    }
}

fn push_chart(charts: &mut Vec<ChartEntry>, data: &MarketData, title: &str) {
    if let (Some(chart_type), Some(chart_data)) = (&data.chart_type, &data.chart_data) {
        charts.push(ChartEntry {
            chart_type: chart_type.clone(),
            data: chart_data.clone(),
            title: title.to_string(),
        });
    }
}

/// Modal-price stats over market records; unparseable prices are excluded
/// from min/max/average but still counted in the record total
fn push_stats(stats: &mut Vec<StatEntry>, data: &MarketData) {
    if data.records.is_empty() {
        return;
    }

    let prices: Vec<f64> = data
        .records
        .iter()
        .filter_map(|r| r.modal_price.trim().parse().ok())
        .collect();

    let (min, max, avg) = if prices.is_empty() {
        (
            Value::from("-"),
            Value::from("-"),
            Value::from("-"),
        )
    } else {
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let avg = (prices.iter().sum::<f64>() / prices.len() as f64).round() as i64;
        (Value::from(min), Value::from(max), Value::from(avg))
    };

    stats.push(StatEntry::new("Minimum Price", min, "TrendingDown", "green"));
    stats.push(StatEntry::new("Maximum Price", max, "TrendingUp", "red"));
    stats.push(StatEntry::new("Average Price", avg, "Activity", "blue"));
    stats.push(StatEntry::new(
        "Records",
        Value::from(data.records.len()),
        "BarChart3",
        "purple",
    ));
}
