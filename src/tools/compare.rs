//! Cross-region price comparison tool
//!
//! Fetches one commodity's records across several states or districts and
//! summarizes which region pays best. Shares the market tool's record shape
//! and chart selection, keyed by state instead of market.

use chrono::Local;
use serde_json::Value;

use crate::ai::GenerativeClient;
use crate::mandi::{MandiClient, MandiRecord, MarketFilters, format_ddmmyyyy, parse_ddmmyyyy};
use crate::tools::market::{date_range, select_chart};
use crate::tools::{MarketData, ToolContext};

/// Records fetched per region per day
const DAILY_RECORD_LIMIT: u32 = 10;

/// Validated arguments for one comparison
#[derive(Debug, Clone, Default)]
pub struct CompareArgs {
    pub commodity_name: String,
    /// States or districts to compare, whichever the call supplied
    pub regions: Vec<String>,
    pub arrival_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl CompareArgs {
    /// Validate raw call arguments; requires `commodityName` and at least
    /// one of `states` / `district` as an array
    #[must_use]
    pub fn from_args(args: Option<&Value>) -> Option<Self> {
        let args = args?;
        let commodity_name = args.get("commodityName")?.as_str()?.to_string();

        let list_of = |name: &str| -> Option<Vec<String>> {
            args.get(name).and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
        };
        let states = list_of("states");
        let districts = list_of("district");
        if states.is_none() && districts.is_none() {
            return None;
        }

        // Prefer states when non-empty, as the declaration documents
        let regions = match (states, districts) {
            (Some(states), _) if !states.is_empty() => states,
            (_, Some(districts)) => districts,
            (Some(states), None) => states,
            (None, None) => return None,
        };

        let field = |name: &str| args.get(name).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            commodity_name,
            regions,
            arrival_date: field("arrivalDate"),
            start_date: field("startDate"),
            end_date: field("endDate"),
        })
    }
}

/// Run the comparison; never fails, errors degrade to the default summary
pub async fn run(
    args: &CompareArgs,
    mandi: &MandiClient,
    ai: &GenerativeClient,
    ctx: &ToolContext,
) -> MarketData {
    tracing::info!(
        commodity = %args.commodity_name,
        regions = args.regions.len(),
        "comparison tool called"
    );

    let (dates, display_range) = match (&args.start_date, &args.end_date) {
        (Some(start), Some(end)) => {
            let parsed = match (parse_ddmmyyyy(start), parse_ddmmyyyy(end)) {
                (Some(start), Some(end)) => date_range(start, end),
                _ => Vec::new(),
            };
            (parsed, format!("{start} to {end}"))
        }
        _ => {
            let single = args
                .arrival_date
                .as_deref()
                .map_or_else(|| Some(Local::now().date_naive()), parse_ddmmyyyy);
            let display = single.map_or_else(String::new, format_ddmmyyyy);
            (single.into_iter().collect(), display)
        }
    };

    let mut records: Vec<MandiRecord> = Vec::new();
    for region in &args.regions {
        let filters = MarketFilters {
            state: Some(region.clone()),
            district: None,
            market: None,
        };
        for &date in &dates {
            match mandi
                .fetch_day(&args.commodity_name, &filters, date, DAILY_RECORD_LIMIT)
                .await
            {
                Ok(day_records) => records.extend(day_records),
                Err(e) => {
                    tracing::warn!(
                        region = %region,
                        date = %format_ddmmyyyy(date),
                        error = %e,
                        "comparison fetch failed, skipping"
                    );
                }
            }
        }
    }

    let (chart_type, chart_data) = select_chart(&records, "state", |r| &r.state);

    let mut summary = format!("No records found for the selected states during {display_range}.");
    if !records.is_empty() {
        let data: Vec<Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "State": r.state,
                    "Market": r.market,
                    "Arrival_Date": r.arrival_date,
                    "Modal_Price": r.modal_price,
                })
            })
            .collect();
        let data_text = serde_json::to_string_pretty(&data).unwrap_or_default();

        let chat_context = ctx.chat_context();
        let context_block = if chat_context.is_empty() {
            String::new()
        } else {
            format!("{chat_context}\n\n")
        };
        let prompt = format!(
            "You are an expert agricultural market analyst. Respond in this language: {}.\n{context_block}Here is mandi price data for {} across states ({display_range}):\n{data_text}\n\nReply with a short, direct, conversational summary (max 3 sentences). Focus on the main trend, a tip for farmers, and a tip for buyers. If data is too little, say so. Use markdown, but keep it concise and to the point like a real chat.",
            ctx.language, args.commodity_name
        );

        match ai.generate(&prompt).await {
            Ok(text) => summary = text,
            Err(e) => {
                tracing::warn!(error = %e, "comparison summary generation failed");
            }
        }
    }

    MarketData {
        records,
        summary,
        error: None,
        chart_type,
        chart_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_require_commodity_and_a_region_list() {
        assert!(CompareArgs::from_args(Some(&json!({"commodityName": "Onion"}))).is_none());
        assert!(
            CompareArgs::from_args(Some(&json!({"states": ["Haryana", "Punjab"]}))).is_none()
        );

        let args = CompareArgs::from_args(Some(&json!({
            "commodityName": "Onion",
            "states": ["Haryana", "Punjab"],
        })))
        .unwrap();
        assert_eq!(args.regions, vec!["Haryana", "Punjab"]);
    }

    #[test]
    fn empty_states_fall_back_to_districts() {
        let args = CompareArgs::from_args(Some(&json!({
            "commodityName": "Onion",
            "states": [],
            "district": ["Gurugram", "Rewari"],
        })))
        .unwrap();
        assert_eq!(args.regions, vec!["Gurugram", "Rewari"]);
    }

    #[test]
    fn district_only_batch_is_accepted() {
        let args = CompareArgs::from_args(Some(&json!({
            "commodityName": "Onion",
            "district": ["Gomati"],
        })))
        .unwrap();
        assert_eq!(args.regions, vec!["Gomati"]);
    }
}
