//! Mandi commodity price API client
//!
//! Two endpoints serve the same data with different conventions: the
//! current-day API uses lowercase field and filter names, the historical API
//! PascalCase. Records are normalized to the historical (PascalCase) shape.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Date format used by the Mandi APIs and the tool arguments
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Format a date as DD/MM/YYYY
#[must_use]
pub fn format_ddmmyyyy(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a DD/MM/YYYY date
#[must_use]
pub fn parse_ddmmyyyy(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

/// One price record, in the historical API's shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandiRecord {
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "District", default)]
    pub district: String,
    #[serde(rename = "Market", default)]
    pub market: String,
    #[serde(rename = "Commodity", default)]
    pub commodity: String,
    #[serde(rename = "Variety", default)]
    pub variety: String,
    #[serde(rename = "Grade", default)]
    pub grade: String,
    #[serde(rename = "Arrival_Date", default)]
    pub arrival_date: String,
    #[serde(rename = "Min_Price", default)]
    pub min_price: String,
    #[serde(rename = "Max_Price", default)]
    pub max_price: String,
    #[serde(rename = "Modal_Price", default)]
    pub modal_price: String,
    /// Only the historical API carries this; empty otherwise
    #[serde(rename = "Commodity_Code", default)]
    pub commodity_code: String,
}

/// One record from the current-day API (lowercase keys)
#[derive(Debug, Clone, Default, Deserialize)]
struct TodayRecord {
    #[serde(default)]
    state: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    market: String,
    #[serde(default)]
    commodity: String,
    #[serde(default)]
    variety: String,
    #[serde(default)]
    grade: String,
    #[serde(default)]
    arrival_date: String,
    #[serde(default)]
    min_price: String,
    #[serde(default)]
    max_price: String,
    #[serde(default)]
    modal_price: String,
}

impl From<TodayRecord> for MandiRecord {
    fn from(record: TodayRecord) -> Self {
        Self {
            state: record.state,
            district: record.district,
            market: record.market,
            commodity: record.commodity,
            variety: record.variety,
            grade: record.grade,
            arrival_date: record.arrival_date,
            min_price: record.min_price,
            max_price: record.max_price,
            modal_price: record.modal_price,
            commodity_code: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecordsResponse<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
}

/// Optional location filters for a price query
#[derive(Debug, Clone, Default)]
pub struct MarketFilters {
    pub state: Option<String>,
    pub district: Option<String>,
    pub market: Option<String>,
}

/// HTTP client for the price APIs
pub struct MandiClient {
    http: reqwest::Client,
    api_key: String,
    today_url: String,
    historical_url: String,
}

impl MandiClient {
    /// Create a client for the given endpoints
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        today_url: impl Into<String>,
        historical_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            today_url: today_url.into(),
            historical_url: historical_url.into(),
        }
    }

    /// Fetch records for one commodity on one date
    ///
    /// Routes to the current-day API when `date` is today, the historical
    /// API otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error on request failure or a non-success status; callers
    /// fetching a date range skip the failed date and continue.
    pub async fn fetch_day(
        &self,
        commodity: &str,
        filters: &MarketFilters,
        date: NaiveDate,
        limit: u32,
    ) -> Result<Vec<MandiRecord>> {
        let is_today = date == Local::now().date_naive();
        let url = self.request_url(commodity, filters, date, limit, is_today);

        tracing::debug!(date = %format_ddmmyyyy(date), is_today, "fetching mandi records");

        let response = self
            .http
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Tool(format!("mandi API error {status}")));
        }

        let records = if is_today {
            response
                .json::<RecordsResponse<TodayRecord>>()
                .await?
                .records
                .into_iter()
                .map(MandiRecord::from)
                .collect()
        } else {
            response.json::<RecordsResponse<MandiRecord>>().await?.records
        };

        Ok(records)
    }

    fn request_url(
        &self,
        commodity: &str,
        filters: &MarketFilters,
        date: NaiveDate,
        limit: u32,
        is_today: bool,
    ) -> String {
        let base = if is_today {
            &self.today_url
        } else {
            &self.historical_url
        };
        let mut url = format!("{base}?api-key={}&format=json&limit={limit}", self.api_key);

        let filter_pairs = [
            (if is_today { "state" } else { "State" }, &filters.state),
            (
                if is_today { "district" } else { "District" },
                &filters.district,
            ),
            (if is_today { "market" } else { "Market" }, &filters.market),
        ];
        for (key, value) in filter_pairs {
            if let Some(value) = value {
                url.push_str(&format!("&filters[{key}]={}", urlencoding::encode(value)));
            }
        }

        let commodity_key = if is_today { "commodity" } else { "Commodity" };
        url.push_str(&format!(
            "&filters[{commodity_key}]={}",
            urlencoding::encode(commodity)
        ));

        // Current-day API has no arrival-date filter
        if !is_today {
            url.push_str(&format!(
                "&filters[Arrival_Date]={}",
                urlencoding::encode(&format_ddmmyyyy(date))
            ));
        }

        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_record_maps_to_pascal_case_shape() {
        let raw = serde_json::json!({
            "state": "Haryana",
            "district": "Gurgaon",
            "market": "Gurgaon",
            "commodity": "Onion",
            "variety": "Red",
            "grade": "FAQ",
            "arrival_date": "07/08/2026",
            "min_price": "900",
            "max_price": "1300",
            "modal_price": "1100"
        });
        let today: TodayRecord = serde_json::from_value(raw).unwrap();
        let record = MandiRecord::from(today);

        assert_eq!(record.state, "Haryana");
        assert_eq!(record.modal_price, "1100");
        assert!(record.commodity_code.is_empty());

        let serialized = serde_json::to_value(&record).unwrap();
        assert_eq!(serialized["Modal_Price"], "1100");
        assert_eq!(serialized["Arrival_Date"], "07/08/2026");
    }

    #[test]
    fn historical_url_carries_pascal_case_filters_and_date() {
        let client = MandiClient::new("key", "https://today.example", "https://hist.example");
        let filters = MarketFilters {
            state: Some("Tamil Nadu".to_string()),
            district: None,
            market: None,
        };
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let url = client.request_url("Onion", &filters, date, 3, false);

        assert!(url.starts_with("https://hist.example?api-key=key&format=json&limit=3"));
        assert!(url.contains("&filters[State]=Tamil%20Nadu"));
        assert!(url.contains("&filters[Commodity]=Onion"));
        assert!(url.contains("&filters[Arrival_Date]=01%2F07%2F2025"));
    }

    #[test]
    fn today_url_uses_lowercase_filters_without_date() {
        let client = MandiClient::new("key", "https://today.example", "https://hist.example");
        let filters = MarketFilters::default();
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let url = client.request_url("Onion", &filters, date, 10, true);

        assert!(url.starts_with("https://today.example?"));
        assert!(url.contains("&filters[commodity]=Onion"));
        assert!(!url.contains("Arrival_Date"));
    }

    #[test]
    fn date_helpers_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 6).unwrap();
        let text = format_ddmmyyyy(date);
        assert_eq!(text, "06/07/2025");
        assert_eq!(parse_ddmmyyyy(&text), Some(date));
        assert_eq!(parse_ddmmyyyy("2025-07-06"), None);
    }
}
