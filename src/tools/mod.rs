//! Local tools the realtime model may invoke
//!
//! Four tools are declared to the session: market-price lookup, cross-region
//! price comparison, government scheme lookup, and crop-disease image
//! diagnosis. The dispatcher routes tool-call batches to them and the
//! synthesizer merges their outputs into one dashboard entry.

pub mod compare;
pub mod diagnosis;
mod dispatcher;
pub mod market;
pub mod schemes;
mod synthesize;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::mandi::MandiRecord;

pub use dispatcher::ToolDispatcher;
pub use synthesize::{
    ChartEntry, NO_INFORMATION_SUMMARY, StatEntry, SynthesizedPayload, SynthesizedResponse,
    SynthesizedResult, synthesize,
};

/// Market price lookup tool name
pub const GET_MARKET_DATA: &str = "get_market_data";

/// Cross-region comparison tool name
pub const COMPARE_STATE_MARKET_DATA: &str = "compare_state_market_data";

/// Government scheme lookup tool name
pub const GET_GOVERNMENT_SCHEMES: &str = "get_government_schemes";

/// Crop disease diagnosis tool name
pub const DIAGNOSE_CROP_DISEASE: &str = "diagnose_crop_disease";

/// Shared input for every call in one batch
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Reply language code
    pub language: String,
    /// Recent dashboard result payloads, oldest first
    pub history: Vec<Value>,
}

impl ToolContext {
    /// Render the history as numbered context blocks for AI prompts
    #[must_use]
    pub fn chat_context(&self) -> String {
        self.history
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("Previous Query #{}:\n{entry}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Result of one tool invocation
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    /// Market price data
    Market(MarketData),
    /// Cross-region comparison data (same shape as market data)
    Comparison(MarketData),
    /// Government scheme search
    Schemes(SchemesResult),
    /// Crop disease diagnosis
    Diagnosis(Diagnosis),
    /// Validation or execution failure
    Error(ErrorResult),
}

impl ToolResult {
    /// Serialize for embedding in a synthesized result's `details`
    #[must_use]
    pub fn to_detail(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Price records plus an AI summary and optional chart
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    #[serde(default)]
    pub records: Vec<MandiRecord>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<Value>,
}

impl MarketData {
    /// A result carrying only an error message
    #[must_use]
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// One government scheme entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernmentScheme {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub eligibility: String,
    #[serde(default)]
    pub application_link: String,
}

/// Scheme search output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemesResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub schemes: Vec<GovernmentScheme>,
}

/// Crop disease diagnosis output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    #[serde(default)]
    pub disease_name: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub treatment: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub language: String,
}

/// A failed call, carried through to the synthesized summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}

impl ErrorResult {
    /// Wrap an error message
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Tool declarations registered with the realtime session
///
/// One tools entry combining search grounding with the four function
/// declarations.
#[must_use]
pub fn declarations() -> Vec<Value> {
    vec![json!({
        "googleSearch": {},
        "functionDeclarations": [
            {
                "name": GET_MARKET_DATA,
                "description": "Retrieves agricultural commodity price data from Indian Mandi markets. Can fetch data for a specific date or a range of dates to identify trends. Defaults to today's date if no date is specified. Provide startDate and endDate for a range, or arrivalDate for a single day. All parameters must be in English.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "commodityName": {
                            "type": "STRING",
                            "description": "The name of the commodity (e.g. 'Cabbage', 'Potato', 'Onion'). Required."
                        },
                        "state": {
                            "type": "STRING",
                            "description": "Optional: state to filter the market data (e.g. 'Haryana')."
                        },
                        "district": {
                            "type": "STRING",
                            "description": "Optional: district to filter the market data (e.g. 'Gurgaon')."
                        },
                        "market": {
                            "type": "STRING",
                            "description": "Optional: market to filter the market data (e.g. 'Garjee')."
                        },
                        "arrivalDate": {
                            "type": "STRING",
                            "description": "Optional: a specific arrival date in DD/MM/YYYY format. Relative terms like 'today' or 'yesterday' must be converted to a concrete date. Not to be used with startDate/endDate."
                        },
                        "startDate": {
                            "type": "STRING",
                            "description": "Optional: start of a date range in DD/MM/YYYY format; requires endDate."
                        },
                        "endDate": {
                            "type": "STRING",
                            "description": "Optional: end of a date range in DD/MM/YYYY format; requires startDate."
                        }
                    },
                    "required": ["commodityName"]
                }
            },
            {
                "name": COMPARE_STATE_MARKET_DATA,
                "description": "Compare modal prices of a commodity across multiple Indian states or districts for a given date or date range. Returns insights per region.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "commodityName": {
                            "type": "STRING",
                            "description": "Name of the commodity to compare (e.g. 'Onion')."
                        },
                        "states": {
                            "type": "ARRAY",
                            "items": {"type": "STRING"},
                            "description": "List of Indian states to compare (e.g. ['Haryana', 'Punjab'])."
                        },
                        "district": {
                            "type": "ARRAY",
                            "items": {"type": "STRING"},
                            "description": "List of Indian districts to compare (e.g. ['Gurugram', 'Rewari'])."
                        },
                        "arrivalDate": {
                            "type": "STRING",
                            "description": "Optional: single day query in DD/MM/YYYY. Cannot be used with startDate/endDate."
                        },
                        "startDate": {
                            "type": "STRING",
                            "description": "Optional: start of date range (DD/MM/YYYY)."
                        },
                        "endDate": {
                            "type": "STRING",
                            "description": "Optional: end of date range (DD/MM/YYYY)."
                        }
                    },
                    "required": ["commodityName"]
                }
            },
            {
                "name": GET_GOVERNMENT_SCHEMES,
                "description": "Fetch relevant government schemes for Indian farmers based on a query and location. Respond in the selected language, using local terms. Return scheme name (local + English), summary, category, and application link.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "query": {
                            "type": "STRING",
                            "description": "Scheme or benefit query, e.g. 'drip irrigation subsidy'"
                        },
                        "location": {
                            "type": "STRING",
                            "description": "State, district, or region"
                        }
                    },
                    "required": ["query", "location"]
                }
            },
            {
                "name": DIAGNOSE_CROP_DISEASE,
                "description": "Diagnose crop disease from an image and provide step-by-step treatment in the selected language. The image is captured after the tool call. Returns disease name, cause, organic/inorganic remedies, and safety warnings.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "image": {
                            "type": "STRING",
                            "description": "Image URL or binary data of the diseased plant"
                        }
                    }
                }
            }
        ]
    })]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_name_all_four_tools() {
        let decls = declarations();
        assert_eq!(decls.len(), 1);
        let functions = decls[0]["functionDeclarations"].as_array().unwrap();
        let names: Vec<&str> = functions
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                GET_MARKET_DATA,
                COMPARE_STATE_MARKET_DATA,
                GET_GOVERNMENT_SCHEMES,
                DIAGNOSE_CROP_DISEASE,
            ]
        );
    }

    #[test]
    fn chat_context_numbers_entries() {
        let ctx = ToolContext {
            language: "hi-IN".to_string(),
            history: vec![json!({"summary": "first"}), json!({"summary": "second"})],
        };
        let rendered = ctx.chat_context();
        assert!(rendered.starts_with("Previous Query #1:"));
        assert!(rendered.contains("Previous Query #2:"));
    }
}
