//! Market price lookup tool
//!
//! Fetches mandi records for one commodity over a date or date range,
//! derives a chart shape from the record spread, and asks the AI service for
//! a short selling-advice summary. A query for today's prices only returns
//! records and chart directly, with no AI round trip.

use chrono::{Local, NaiveDate};
use serde_json::Value;

use crate::ai::GenerativeClient;
use crate::mandi::{MandiClient, MandiRecord, MarketFilters, format_ddmmyyyy, parse_ddmmyyyy};
use crate::tools::{MarketData, ToolContext};

/// Records fetched per day
const DAILY_RECORD_LIMIT: u32 = 3;

/// Validated arguments for one market lookup
#[derive(Debug, Clone, Default)]
pub struct MarketArgs {
    pub commodity_name: String,
    pub state: Option<String>,
    pub district: Option<String>,
    pub market: Option<String>,
    pub arrival_date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl MarketArgs {
    /// Validate raw call arguments; `commodityName` is required
    #[must_use]
    pub fn from_args(args: Option<&Value>) -> Option<Self> {
        let args = args?;
        let commodity_name = args.get("commodityName")?.as_str()?.to_string();
        let field = |name: &str| args.get(name).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            commodity_name,
            state: field("state"),
            district: field("district"),
            market: field("market"),
            arrival_date: field("arrivalDate"),
            start_date: field("startDate"),
            end_date: field("endDate"),
        })
    }
}

/// Run the lookup; never fails, errors are carried in the result
pub async fn run(
    args: &MarketArgs,
    mandi: &MandiClient,
    ai: &GenerativeClient,
    ctx: &ToolContext,
) -> MarketData {
    tracing::info!(commodity = %args.commodity_name, "market data tool called");

    let today = Local::now().date_naive();

    let (dates, display_range, is_today_only) = match (&args.start_date, &args.end_date) {
        (Some(start), Some(end)) => {
            let (Some(start), Some(end)) = (parse_ddmmyyyy(start), parse_ddmmyyyy(end)) else {
                return MarketData::from_error(
                    "Invalid date range provided. Please use DD/MM/YYYY format and ensure start date is not after end date.",
                );
            };
            if start > end {
                return MarketData::from_error(
                    "Invalid date range provided. Please use DD/MM/YYYY format and ensure start date is not after end date.",
                );
            }
            let display = format!("{} to {}", format_ddmmyyyy(start), format_ddmmyyyy(end));
            (date_range(start, end), display, false)
        }
        _ => {
            let single = match &args.arrival_date {
                Some(text) => match parse_ddmmyyyy(text) {
                    Some(date) => date,
                    None => {
                        return MarketData::from_error(
                            "Invalid single date provided. Please use DD/MM/YYYY format.",
                        );
                    }
                },
                None => today,
            };
            (vec![single], format_ddmmyyyy(single), single == today)
        }
    };

    let filters = MarketFilters {
        state: args.state.clone(),
        district: args.district.clone(),
        market: args.market.clone(),
    };

    let mut records: Vec<MandiRecord> = Vec::new();
    for date in dates {
        match mandi
            .fetch_day(&args.commodity_name, &filters, date, DAILY_RECORD_LIMIT)
            .await
        {
            Ok(day_records) => records.extend(day_records),
            Err(e) => {
                tracing::warn!(date = %format_ddmmyyyy(date), error = %e, "mandi fetch failed, skipping date");
            }
        }
    }

    let (chart_type, chart_data) = select_chart(&records, "market", |r| &r.market);

    // Today-only queries skip AI analysis and return data directly
    if is_today_only {
        return MarketData {
            records,
            summary: String::new(),
            error: None,
            chart_type,
            chart_data,
        };
    }

    let summary = if records.is_empty() {
        format!(
            "No market data available for {} in {} {} {} for the period {}. Please check your filters or try another date/range.",
            args.commodity_name,
            args.state.as_deref().unwrap_or("any state"),
            args.district.as_deref().unwrap_or("any district"),
            args.market.as_deref().unwrap_or("any market"),
            display_range
        )
    } else {
        summarize(args, &records, &display_range, ai, ctx).await
    };

    MarketData {
        records,
        summary,
        error: None,
        chart_type,
        chart_data,
    }
}

/// Ask the AI service for a short conversational summary of the records
async fn summarize(
    args: &MarketArgs,
    records: &[MandiRecord],
    display_range: &str,
    ai: &GenerativeClient,
    ctx: &ToolContext,
) -> String {
    let data: Vec<Value> = records
        .iter()
        .map(|r| {
            serde_json::json!({
                "Commodity": r.commodity,
                "State": r.state,
                "District": r.district,
                "Market": r.market,
                "Arrival_Date": r.arrival_date,
                "Min_Price": r.min_price,
                "Max_Price": r.max_price,
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
        "You are an expert agricultural market analyst.\n{context_block}Here is mandi price data for {} ({display_range}):\n{data_text}\n\nReply with a short, direct, conversational summary (max 3 sentences). Focus on the main trend, a tip for farmers, and a tip for buyers. If data is too little, say so. Use markdown, but keep it concise and to the point like a real chat. Response must be in this language: {}",
        args.commodity_name, ctx.language
    );

    match ai.generate(&prompt).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            "The AI could not generate specific market insights based on the provided data."
                .to_string()
        }
        Err(e) => {
            tracing::error!(error = %e, "market summary generation failed");
            format!(
                "Error analyzing data with AI: Failed to connect to AI service or generate content. Details: {e}"
            )
        }
    }
}

/// Inclusive list of days from `start` to `end`
pub(crate) fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        let Some(next) = current.succ_opt() else {
            break;
        };
        current = next;
    }
    dates
}

fn parse_price(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

fn price_value(text: &str) -> Value {
    parse_price(text).map_or(Value::Null, Value::from)
}

/// Pick a chart shape from the spread of records
///
/// One region over many dates plots a price line; many regions on one date
/// compare as bars; many regions over many dates group bars per date. The
/// region key is the market name here and the state name for comparisons.
pub(crate) fn select_chart(
    records: &[MandiRecord],
    key_label: &str,
    key_of: fn(&MandiRecord) -> &str,
) -> (Option<String>, Option<Value>) {
    if records.is_empty() {
        return (None, None);
    }

    let mut keys: Vec<&str> = Vec::new();
    let mut dates: Vec<&str> = Vec::new();
    for record in records {
        if !keys.contains(&key_of(record)) {
            keys.push(key_of(record));
        }
        if !dates.contains(&record.arrival_date.as_str()) {
            dates.push(&record.arrival_date);
        }
    }

    if keys.len() == 1 && dates.len() > 1 {
        let rows: Vec<Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "date": r.arrival_date,
                    "modal": price_value(&r.modal_price),
                    "min": price_value(&r.min_price),
                    "max": price_value(&r.max_price),
                })
            })
            .collect();
        (Some("line".to_string()), Some(Value::from(rows)))
    } else if keys.len() > 1 && dates.len() > 1 {
        let rows: Vec<Value> = dates
            .iter()
            .map(|date| {
                let mut row = serde_json::Map::new();
                row.insert("date".to_string(), Value::from(*date));
                for key in &keys {
                    let value = records
                        .iter()
                        .find(|r| key_of(r) == *key && r.arrival_date == *date)
                        .map_or(Value::Null, |r| price_value(&r.modal_price));
                    row.insert((*key).to_string(), value);
                }
                Value::Object(row)
            })
            .collect();
        (Some("grouped-bar".to_string()), Some(Value::from(rows)))
    } else {
        // Single date across regions, or a lone record
        let rows: Vec<Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    key_label: key_of(r),
                    "modal": price_value(&r.modal_price),
                    "min": price_value(&r.min_price),
                    "max": price_value(&r.max_price),
                })
            })
            .collect();
        (Some("bar".to_string()), Some(Value::from(rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(market: &str, date: &str, modal: &str) -> MandiRecord {
        MandiRecord {
            market: market.to_string(),
            arrival_date: date.to_string(),
            modal_price: modal.to_string(),
            min_price: "900".to_string(),
            max_price: "1300".to_string(),
            ..MandiRecord::default()
        }
    }

    #[test]
    fn args_require_commodity_name() {
        assert!(MarketArgs::from_args(Some(&serde_json::json!({"state": "Haryana"}))).is_none());
        assert!(MarketArgs::from_args(None).is_none());

        let args =
            MarketArgs::from_args(Some(&serde_json::json!({"commodityName": "Onion"}))).unwrap();
        assert_eq!(args.commodity_name, "Onion");
        assert!(args.state.is_none());
    }

    #[test]
    fn single_market_many_dates_plots_line() {
        let records = vec![
            record("Gurgaon", "01/07/2025", "1000"),
            record("Gurgaon", "02/07/2025", "1200"),
        ];
        let (chart_type, chart_data) = select_chart(&records, "market", |r| &r.market);
        assert_eq!(chart_type.as_deref(), Some("line"));
        let rows = chart_data.unwrap();
        assert_eq!(rows[0]["date"], "01/07/2025");
        assert_eq!(rows[1]["modal"], 1200.0);
    }

    #[test]
    fn many_markets_one_date_plots_bar() {
        let records = vec![
            record("Gurgaon", "01/07/2025", "1000"),
            record("Rewari", "01/07/2025", "1100"),
        ];
        let (chart_type, chart_data) = select_chart(&records, "market", |r| &r.market);
        assert_eq!(chart_type.as_deref(), Some("bar"));
        assert_eq!(chart_data.unwrap()[1]["market"], "Rewari");
    }

    #[test]
    fn many_markets_many_dates_group_bars_with_gaps() {
        let records = vec![
            record("Gurgaon", "01/07/2025", "1000"),
            record("Rewari", "01/07/2025", "1100"),
            record("Gurgaon", "02/07/2025", "1050"),
        ];
        let (chart_type, chart_data) = select_chart(&records, "market", |r| &r.market);
        assert_eq!(chart_type.as_deref(), Some("grouped-bar"));
        let rows = chart_data.unwrap();
        assert_eq!(rows[0]["Gurgaon"], 1000.0);
        assert_eq!(rows[1]["Rewari"], Value::Null);
    }

    #[test]
    fn lone_record_falls_back_to_bar() {
        let records = vec![record("Gurgaon", "01/07/2025", "1000")];
        let (chart_type, _) = select_chart(&records, "market", |r| &r.market);
        assert_eq!(chart_type.as_deref(), Some("bar"));
    }

    #[test]
    fn empty_records_have_no_chart() {
        let (chart_type, chart_data) = select_chart(&[], "market", |r| &r.market);
        assert!(chart_type.is_none());
        assert!(chart_data.is_none());
    }

    #[test]
    fn unparseable_price_becomes_null() {
        let records = vec![record("Gurgaon", "01/07/2025", "n/a")];
        let (_, chart_data) = select_chart(&records, "market", |r| &r.market);
        assert_eq!(chart_data.unwrap()[0]["modal"], Value::Null);
    }

    #[test]
    fn date_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 7, 3).unwrap();
        assert_eq!(date_range(start, end).len(), 3);
        assert_eq!(date_range(end, start).len(), 0);
        assert_eq!(date_range(start, start), vec![start]);
    }
}
