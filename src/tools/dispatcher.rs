//! Tool call dispatch
//!
//! Executes one batch of tool calls strictly sequentially, in array order;
//! later calls may depend on UI state earlier ones produced. Argument
//! validation short-circuits a call to an error result without invoking the
//! tool; a failed call never stops the rest of the batch. The diagnosis tool
//! defers to the frontend for image capture through a per-call one-shot
//! handle, so repeated requests cannot clobber each other.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::ai::GenerativeClient;
use crate::dashboard::{DashboardHistory, LoadingState, UiBridge};
use crate::mandi::MandiClient;
use crate::session::wire::{FunctionCall, ToolCallRequest};
use crate::tools::compare::{self, CompareArgs};
use crate::tools::market::{self, MarketArgs};
use crate::tools::schemes::{self, SchemesArgs};
use crate::tools::{
    COMPARE_STATE_MARKET_DATA, DIAGNOSE_CROP_DISEASE, ErrorResult, GET_GOVERNMENT_SCHEMES,
    GET_MARKET_DATA, SynthesizedResult, ToolContext, ToolResult, diagnosis, synthesize,
};

/// Routes tool-call batches to the local tools
pub struct ToolDispatcher {
    mandi: Arc<MandiClient>,
    ai: Arc<GenerativeClient>,
    history: Arc<Mutex<DashboardHistory>>,
    ui: UiBridge,
}

impl ToolDispatcher {
    /// Create a dispatcher over the provider clients and UI bridge
    #[must_use]
    pub fn new(
        mandi: Arc<MandiClient>,
        ai: Arc<GenerativeClient>,
        history: Arc<Mutex<DashboardHistory>>,
        ui: UiBridge,
    ) -> Self {
        Self {
            mandi,
            ai,
            history,
            ui,
        }
    }

    /// Execute a batch and return the synthesized tool response
    ///
    /// The loading indicator names the batch's first tool and is cleared
    /// unconditionally once every call has settled. The synthesized result
    /// is appended to the dashboard before being returned for the session
    /// to send back.
    pub async fn dispatch(
        &self,
        request: &ToolCallRequest,
        ctx: &ToolContext,
    ) -> SynthesizedResult {
        let first_tool = request
            .function_calls
            .first()
            .map_or_else(|| "Tool".to_string(), |call| call.name.clone());
        self.ui.set_loading(LoadingState::active(first_tool));

        let mut calls: Vec<FunctionCall> = Vec::new();
        let mut results: Vec<ToolResult> = Vec::new();

        for fc in &request.function_calls {
            match fc.name.as_str() {
                GET_MARKET_DATA => {
                    let result = match MarketArgs::from_args(fc.args.as_ref()) {
                        Some(args) => ToolResult::Market(
                            market::run(&args, &self.mandi, &self.ai, ctx).await,
                        ),
                        None => ToolResult::Error(ErrorResult::new(
                            "Missing or invalid 'commodityName' argument for get_market_data.",
                        )),
                    };
                    calls.push(fc.clone());
                    results.push(result);
                }
                COMPARE_STATE_MARKET_DATA => {
                    let result = match CompareArgs::from_args(fc.args.as_ref()) {
                        Some(args) => ToolResult::Comparison(
                            compare::run(&args, &self.mandi, &self.ai, ctx).await,
                        ),
                        None => ToolResult::Error(ErrorResult::new(
                            "Missing or invalid arguments for compare_state_market_data. Must provide commodityName and at least one of states or district.",
                        )),
                    };
                    calls.push(fc.clone());
                    results.push(result);
                }
                GET_GOVERNMENT_SCHEMES => {
                    let result = match SchemesArgs::from_args(fc.args.as_ref()) {
                        Some(args) => {
                            ToolResult::Schemes(schemes::run(&args, &self.ai, ctx).await)
                        }
                        None => ToolResult::Error(ErrorResult::new(
                            "Missing or invalid arguments for get_government_schemes. Must provide query and location.",
                        )),
                    };
                    calls.push(fc.clone());
                    results.push(result);
                }
                DIAGNOSE_CROP_DISEASE => {
                    if let Some(receiver) = self.ui.request_image() {
                        // Suspend this one call until the frontend answers
                        match receiver.await {
                            Ok(Some(image)) if !image.is_empty() => {
                                let result = diagnosis::run(&image, &self.ai, ctx).await;
                                calls.push(fc.clone());
                                results.push(ToolResult::Diagnosis(result));
                            }
                            _ => {
                                tracing::debug!("image capture cancelled, diagnosis skipped");
                            }
                        }
                    } else {
                        let image = fc
                            .args
                            .as_ref()
                            .and_then(|args| args.get("image"))
                            .and_then(Value::as_str);
                        let result = match image {
                            Some("") => ToolResult::Error(ErrorResult::new("No image provided.")),
                            Some(image) => {
                                ToolResult::Diagnosis(diagnosis::run(image, &self.ai, ctx).await)
                            }
                            None => ToolResult::Error(ErrorResult::new(
                                "Missing or invalid arguments for diagnose_crop_disease. Must provide image.",
                            )),
                        };
                        calls.push(fc.clone());
                        results.push(result);
                    }
                }
                unknown => {
                    tracing::warn!(tool = %unknown, "unknown tool requested");
                    calls.push(fc.clone());
                    results.push(ToolResult::Error(ErrorResult::new(format!(
                        "Unknown tool: {unknown}"
                    ))));
                }
            }
        }

        // Cleared on every path, success or error
        self.ui.set_loading(LoadingState::inactive());

        let synthesized = synthesize(&calls, &results);
        if let Ok(mut history) = self.history.lock() {
            history.push(synthesized.clone());
        }
        self.ui.push_result(synthesized.clone());
        synthesized
    }
}
