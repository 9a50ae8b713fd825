//! Alpaca market-data wire types

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::types::{Bar, Interval};

#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
    #[serde(rename = "n", default)]
    pub trade_count: Option<u64>,
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,
}

impl AlpacaBar {
    pub fn to_bar(&self, tz: Tz) -> Bar {
        Bar::new_unchecked(
            self.timestamp.with_timezone(&tz),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

/// `GET /v2/stocks/{symbol}/bars` response page
#[derive(Debug, Clone, Deserialize)]
pub struct BarsResponse {
    /// `null` when the range has no bars
    #[serde(default)]
    pub bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error body returned on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// Alpaca `timeframe` query value
pub fn timeframe(interval: Interval) -> &'static str {
    match interval {
        Interval::Daily => "1Day",
        Interval::FifteenMinute => "15Min",
        Interval::FiveMinute => "5Min",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::New_York;

    #[test]
    fn test_parse_bars_page() {
        let json = r#"{
            "bars": [
                {"t":"2025-03-10T13:30:00Z","o":227.5,"h":228.1,"l":226.9,"c":227.8,"v":1204331,"n":15022,"vw":227.6},
                {"t":"2025-03-10T13:35:00Z","o":227.8,"h":228.0,"l":227.1,"c":227.2,"v":804112}
            ],
            "symbol": "AAPL",
            "next_page_token": "QUFQTHxNfDIwMjU="
        }"#;
        let page: BarsResponse = serde_json::from_str(json).unwrap();
        let bars = page.bars.unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].vwap, None);
        assert_eq!(page.next_page_token.as_deref(), Some("QUFQTHxNfDIwMjU="));

        let local = bars[0].to_bar(New_York);
        assert_eq!(local.timestamp.hour(), 9);
        assert_eq!(local.timestamp.minute(), 30);
    }

    #[test]
    fn test_empty_page() {
        let page: BarsResponse =
            serde_json::from_str(r#"{"bars": null, "symbol": "AAPL", "next_page_token": null}"#).unwrap();
        assert!(page.bars.is_none());
        assert!(page.next_page_token.is_none());
    }
}
