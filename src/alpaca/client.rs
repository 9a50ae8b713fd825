//! Alpaca market-data REST client
//!
//! Blocking client over `GET /v2/stocks/{symbol}/bars` with page-token
//! pagination.

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration as StdDuration;
use tracing::{debug, warn};

use super::types::{timeframe, ApiErrorBody, BarsResponse};
use crate::data::DataProvider;
use crate::error::{ProviderError, ScalperError};
use crate::types::{Bar, BarSeries, Interval, Symbol};

/// Base URL for Alpaca market data
pub const ALPACA_DATA_BASE: &str = "https://data.alpaca.markets";

/// Maximum bars per page (Alpaca limit)
const MAX_BARS_PER_PAGE: u32 = 10_000;

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API key pair read from the environment
#[derive(Clone)]
pub struct AlpacaCredentials {
    pub key_id: String,
    pub secret_key: String,
}

impl std::fmt::Debug for AlpacaCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaCredentials")
            .field("key_id", &"***")
            .field("secret_key", &"***")
            .finish()
    }
}

impl AlpacaCredentials {
    /// `ALPACA_API_KEY` / `ALPACA_SECRET_KEY`
    pub fn from_env() -> Result<Self, ScalperError> {
        let key_id = std::env::var("ALPACA_API_KEY").ok().filter(|v| !v.is_empty());
        let secret_key = std::env::var("ALPACA_SECRET_KEY").ok().filter(|v| !v.is_empty());
        match (key_id, secret_key) {
            (Some(key_id), Some(secret_key)) => Ok(Self { key_id, secret_key }),
            _ => Err(ScalperError::InvalidConfiguration(
                "ALPACA_API_KEY and ALPACA_SECRET_KEY must be set for the alpaca provider".into(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlpacaProvider {
    client: Client,
    base_url: String,
    feed: String,
    timezone: Tz,
}

impl AlpacaProvider {
    pub fn new(credentials: &AlpacaCredentials, feed: &str, timezone: Tz) -> Result<Self, ScalperError> {
        Self::with_base_url(credentials, feed, timezone, ALPACA_DATA_BASE)
    }

    pub fn with_base_url(
        credentials: &AlpacaCredentials,
        feed: &str,
        timezone: Tz,
        base_url: &str,
    ) -> Result<Self, ScalperError> {
        let header = |value: &str| {
            HeaderValue::from_str(value).map_err(|_| {
                ScalperError::InvalidConfiguration("Alpaca credentials contain invalid characters".into())
            })
        };

        let mut headers = HeaderMap::new();
        headers.insert("APCA-API-KEY-ID", header(&credentials.key_id)?);
        headers.insert("APCA-API-SECRET-KEY", header(&credentials.secret_key)?);

        let client = Client::builder()
            .timeout(StdDuration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(ProviderError::from)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            feed: feed.to_string(),
            timezone,
        })
    }

    /// RFC3339 bounds covering local midnight of `start` to local midnight after `end`
    fn range_bounds(&self, start: NaiveDate, end: NaiveDate) -> Result<(String, String), ProviderError> {
        let local_midnight = |date: NaiveDate| {
            date.and_hms_opt(0, 0, 0)
                .and_then(|naive| self.timezone.from_local_datetime(&naive).earliest())
                .map(|dt| dt.to_rfc3339())
                .ok_or_else(|| ProviderError::Parse(format!("no local midnight on {}", date)))
        };
        let next_day = end
            .succ_opt()
            .ok_or_else(|| ProviderError::Parse(format!("date out of range: {}", end)))?;
        Ok((local_midnight(start)?, local_midnight(next_day)?))
    }

    fn fetch_page(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start: &str,
        end: &str,
        page_token: Option<&str>,
    ) -> Result<BarsResponse, ProviderError> {
        let url = format!("{}/v2/stocks/{}/bars", self.base_url, symbol.as_str());
        let limit = MAX_BARS_PER_PAGE.to_string();
        let mut params = vec![
            ("timeframe", timeframe(interval)),
            ("start", start),
            ("end", end),
            ("limit", limit.as_str()),
            ("adjustment", "raw"),
            ("feed", self.feed.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("page_token", token));
        }

        debug!("Fetching bars: symbol={}, timeframe={}, start={}", symbol, timeframe(interval), start);

        let response = self.client.get(&url).query(&params).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<BarsResponse>()
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

impl DataProvider for AlpacaProvider {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn fetch_bars(
        &self,
        symbol: &Symbol,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BarSeries, ProviderError> {
        let (start_ts, end_ts) = self.range_bounds(start, end)?;
        let mut bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.fetch_page(symbol, interval, &start_ts, &end_ts, page_token.as_deref())?;
            for raw in page.bars.unwrap_or_default() {
                let bar = raw.to_bar(self.timezone);
                match bar.validate() {
                    Ok(()) => bars.push(bar),
                    Err(e) => warn!("{} {}: dropping bar at {}: {}", symbol, interval, bar.timestamp, e),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        bars.retain(|b| b.date() >= start && b.date() <= end);
        debug!("{} {}: {} bars from alpaca", symbol, interval, bars.len());
        Ok(BarSeries::from_unsorted(symbol.clone(), interval, bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    fn credentials() -> AlpacaCredentials {
        AlpacaCredentials {
            key_id: "key".into(),
            secret_key: "secret".into(),
        }
    }

    #[test]
    fn test_range_bounds_follow_local_midnight() {
        let provider = AlpacaProvider::new(&credentials(), "iex", New_York).unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let (from, to) = provider.range_bounds(start, end).unwrap();
        assert_eq!(from, "2025-03-07T00:00:00-05:00");
        // DST starts on 2025-03-09
        assert_eq!(to, "2025-03-11T00:00:00-04:00");
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let rendered = format!("{:?}", credentials());
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_unreachable_host_is_typed() {
        let provider =
            AlpacaProvider::with_base_url(&credentials(), "iex", New_York, "http://127.0.0.1:9").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let err = provider
            .fetch_bars(&Symbol::new("AAPL"), Interval::FiveMinute, date, date)
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unreachable(_)));
    }
}
