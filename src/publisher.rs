//! Signal publishing and bracket-order submission
//!
//! Thin HTTP clients for the two outbound collaborators: the signal sink
//! (which fans out to chat channels) and the order executor (which places an
//! Alpaca bracket order). A signal counts as sent when either one accepts it.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration as StdDuration;
use tracing::{error, info, warn};

use crate::config::PublisherConfig;
use crate::error::ScalperError;
use crate::types::{local_time, Direction, TradeCandidate};

const PUBLISH_TIMEOUT_SECS: u64 = 10;
const EXECUTOR_TIMEOUT_SECS: u64 = 30;

/// JSON body posted to the signal endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalPayload {
    pub asset_code: String,
    pub signal_type: Direction,
    pub entry_price: f64,
    pub target_price: f64,
    pub stop_loss_price: f64,
    pub pattern: String,
    pub box_high: f64,
    pub box_low: f64,
    pub daily_atr: f64,
    pub timestamp: String,
}

impl From<&TradeCandidate> for SignalPayload {
    fn from(c: &TradeCandidate) -> Self {
        Self {
            asset_code: c.symbol.to_string(),
            signal_type: c.direction,
            entry_price: c.entry_price.to_f64(),
            target_price: c.target_price.to_f64(),
            stop_loss_price: c.stop_loss.to_f64(),
            pattern: c.pattern.to_string(),
            box_high: c.box_high.to_f64(),
            box_low: c.box_low.to_f64(),
            daily_atr: c.atr.to_f64(),
            timestamp: c.timestamp.format(local_time::FORMAT).to_string(),
        }
    }
}

/// JSON body posted to the order executor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketOrder {
    pub symbol: String,
    pub side: Direction,
    pub notional: f64,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
}

impl BracketOrder {
    pub fn from_candidate(candidate: &TradeCandidate, notional: f64) -> Self {
        Self {
            symbol: candidate.symbol.to_string(),
            side: candidate.direction,
            notional,
            entry_price: candidate.entry_price.to_f64(),
            stop_loss_price: candidate.stop_loss.to_f64(),
            take_profit_price: candidate.target_price.to_f64(),
        }
    }
}

/// Executor reply; only `success` is relied on
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

pub trait SignalPublisher: Send + Sync {
    fn publish(&self, payload: &SignalPayload) -> Result<(), ScalperError>;
}

pub trait OrderExecutor: Send + Sync {
    fn submit(&self, order: &BracketOrder) -> Result<OrderAck, ScalperError>;
}

fn http_client(timeout_secs: u64) -> Result<Client, ScalperError> {
    Client::builder()
        .timeout(StdDuration::from_secs(timeout_secs))
        .build()
        .map_err(client_error)
}

fn client_error(e: reqwest::Error) -> ScalperError {
    ScalperError::InvalidConfiguration(format!("cannot build HTTP client: {}", e))
}

/// POSTs the payload as JSON; only HTTP 200 counts as delivered
pub struct HttpSignalPublisher {
    client: Client,
    url: String,
}

impl HttpSignalPublisher {
    pub fn new(url: impl Into<String>) -> Result<Self, ScalperError> {
        Ok(Self {
            client: http_client(PUBLISH_TIMEOUT_SECS)?,
            url: url.into(),
        })
    }
}

impl SignalPublisher for HttpSignalPublisher {
    fn publish(&self, payload: &SignalPayload) -> Result<(), ScalperError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .map_err(|e| ScalperError::Publish(format!("signal endpoint: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            info!("Signal published for {}", payload.asset_code);
            Ok(())
        } else {
            Err(ScalperError::Publish(format!(
                "signal endpoint returned {}",
                status
            )))
        }
    }
}

/// POSTs a bracket order with an optional bearer token
pub struct OrderExecutorClient {
    client: Client,
    url: String,
    token: Option<String>,
}

impl OrderExecutorClient {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self, ScalperError> {
        Ok(Self {
            client: http_client(EXECUTOR_TIMEOUT_SECS)?,
            url: url.into(),
            token,
        })
    }
}

impl OrderExecutor for OrderExecutorClient {
    fn submit(&self, order: &BracketOrder) -> Result<OrderAck, ScalperError> {
        let mut request = self.client.post(&self.url).json(order);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| ScalperError::Publish(format!("order executor: {}", e)))?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(ScalperError::Publish(format!(
                "order executor returned {}: {}",
                status, body
            )));
        }

        let ack: OrderAck = response
            .json()
            .map_err(|e| ScalperError::Publish(format!("order executor reply: {}", e)))?;
        if ack.success {
            info!("Bracket order accepted for {} ({:?})", order.symbol, ack.order_id);
            Ok(ack)
        } else {
            Err(ScalperError::Publish(format!(
                "order executor rejected {} (status {:?})",
                order.symbol, ack.status
            )))
        }
    }
}

/// Logs instead of sending; always succeeds
#[derive(Debug, Default)]
pub struct DryRunPublisher;

impl SignalPublisher for DryRunPublisher {
    fn publish(&self, payload: &SignalPayload) -> Result<(), ScalperError> {
        let body = serde_json::to_string(payload).unwrap_or_default();
        info!("[dry-run] signal payload: {}", body);
        Ok(())
    }
}

impl OrderExecutor for DryRunPublisher {
    fn submit(&self, order: &BracketOrder) -> Result<OrderAck, ScalperError> {
        let body = serde_json::to_string(order).unwrap_or_default();
        info!("[dry-run] bracket order: {}", body);
        Ok(OrderAck {
            success: true,
            order_id: None,
            status: Some("dry_run".to_string()),
        })
    }
}

/// Which collaborators accepted a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub published: bool,
    pub ordered: bool,
}

impl DispatchReport {
    pub fn sent(&self) -> bool {
        self.published || self.ordered
    }
}

pub struct SignalDispatcher {
    publisher: Option<Box<dyn SignalPublisher>>,
    executor: Option<Box<dyn OrderExecutor>>,
    position_size_usd: f64,
}

impl SignalDispatcher {
    pub fn new(
        publisher: Option<Box<dyn SignalPublisher>>,
        executor: Option<Box<dyn OrderExecutor>>,
        position_size_usd: f64,
    ) -> Self {
        Self {
            publisher,
            executor,
            position_size_usd,
        }
    }

    /// Wire collaborators from config.
    ///
    /// Fails when trading is enabled without an executor URL, or when there is
    /// nowhere to send a signal at all.
    pub fn from_config(config: &PublisherConfig, dry_run: bool) -> Result<Self, ScalperError> {
        if dry_run {
            let executor: Option<Box<dyn OrderExecutor>> = if config.trading_enabled {
                Some(Box::new(DryRunPublisher))
            } else {
                None
            };
            return Ok(Self::new(
                Some(Box::new(DryRunPublisher)),
                executor,
                config.position_size_usd,
            ));
        }

        let publisher: Option<Box<dyn SignalPublisher>> = match &config.endpoint_url {
            Some(url) if !url.is_empty() => Some(Box::new(HttpSignalPublisher::new(url.clone())?)),
            _ => None,
        };

        let executor: Option<Box<dyn OrderExecutor>> = if config.trading_enabled {
            match &config.order_executor_url {
                Some(url) if !url.is_empty() => Some(Box::new(OrderExecutorClient::new(
                    url.clone(),
                    config.order_executor_token.clone(),
                )?)),
                _ => {
                    return Err(ScalperError::InvalidConfiguration(
                        "trading_enabled requires ORDER_EXECUTOR_URL".into(),
                    ))
                }
            }
        } else {
            None
        };

        if publisher.is_none() && executor.is_none() {
            return Err(ScalperError::InvalidConfiguration(
                "no SIGNAL_ENDPOINT_URL configured and trading disabled".into(),
            ));
        }

        Ok(Self::new(publisher, executor, config.position_size_usd))
    }

    /// Send to every configured collaborator; errors only if none accepted
    pub fn dispatch(&self, candidate: &TradeCandidate) -> Result<DispatchReport, ScalperError> {
        let mut report = DispatchReport::default();

        if let Some(publisher) = &self.publisher {
            match publisher.publish(&SignalPayload::from(candidate)) {
                Ok(()) => report.published = true,
                Err(e) => warn!("Signal publish failed for {}: {}", candidate.symbol, e),
            }
        }

        if let Some(executor) = &self.executor {
            let order = BracketOrder::from_candidate(candidate, self.position_size_usd);
            match executor.submit(&order) {
                Ok(_) => report.ordered = true,
                Err(e) => error!("Bracket order failed for {}: {}", candidate.symbol, e),
            }
        }

        if report.sent() {
            Ok(report)
        } else {
            Err(ScalperError::Publish(format!(
                "no collaborator accepted the {} signal",
                candidate.symbol
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Money, Pattern, Symbol, TradeLevels};
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn candidate() -> TradeCandidate {
        TradeCandidate {
            symbol: Symbol::new("AAPL"),
            direction: Direction::Long,
            pattern: Pattern::BullishEngulfing,
            entry_price: Money::cents(102.5),
            stop_loss: Money::cents(99.5),
            target_price: Money::cents(106.0),
            box_high: Money::cents(106.0),
            box_low: Money::cents(101.0),
            atr: Money::cents(8.123),
            timestamp: New_York.with_ymd_and_hms(2025, 3, 10, 10, 5, 0).unwrap(),
            levels: TradeLevels {
                entry: 102.5,
                stop: 99.5,
                target: 106.0,
            },
        }
    }

    struct Failing;

    impl SignalPublisher for Failing {
        fn publish(&self, _payload: &SignalPayload) -> Result<(), ScalperError> {
            Err(ScalperError::Publish("down".into()))
        }
    }

    impl OrderExecutor for Failing {
        fn submit(&self, _order: &BracketOrder) -> Result<OrderAck, ScalperError> {
            Err(ScalperError::Publish("down".into()))
        }
    }

    struct Counting(Arc<AtomicUsize>);

    impl OrderExecutor for Counting {
        fn submit(&self, order: &BracketOrder) -> Result<OrderAck, ScalperError> {
            assert_eq!(order.notional, 250.0);
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(OrderAck {
                success: true,
                ..OrderAck::default()
            })
        }
    }

    #[test]
    fn test_payload_shape() {
        let payload = SignalPayload::from(&candidate());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["asset_code"], "AAPL");
        assert_eq!(json["signal_type"], "LONG");
        assert_eq!(json["pattern"], "bullish_engulfing");
        assert_eq!(json["entry_price"], 102.5);
        assert_eq!(json["daily_atr"], 8.12);
        assert_eq!(json["timestamp"], "2025-03-10 10:05:00");
    }

    #[test]
    fn test_sent_if_either_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = SignalDispatcher::new(
            Some(Box::new(Failing)),
            Some(Box::new(Counting(calls.clone()))),
            250.0,
        );
        let report = dispatcher.dispatch(&candidate()).unwrap();
        assert!(!report.published);
        assert!(report.ordered);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_failed_is_publish_error() {
        let dispatcher = SignalDispatcher::new(Some(Box::new(Failing)), Some(Box::new(Failing)), 100.0);
        let err = dispatcher.dispatch(&candidate()).unwrap_err();
        assert!(matches!(err, ScalperError::Publish(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_dry_run_counts_as_sent() {
        let config = PublisherConfig::default();
        let dispatcher = SignalDispatcher::from_config(&config, true).unwrap();
        assert!(dispatcher.dispatch(&candidate()).unwrap().sent());
    }

    #[test]
    fn test_trading_without_executor_url_is_config_error() {
        let config = PublisherConfig {
            endpoint_url: Some("http://localhost:8080/signal".into()),
            trading_enabled: true,
            ..PublisherConfig::default()
        };
        let err = SignalDispatcher::from_config(&config, false).err().unwrap();
        assert!(matches!(err, ScalperError::InvalidConfiguration(_)));

        let err = SignalDispatcher::from_config(&PublisherConfig::default(), false)
            .err()
            .unwrap();
        assert!(matches!(err, ScalperError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_client_build_failure_is_config_error() {
        let err = Client::new().get("not a url").build().unwrap_err();
        let err = client_error(err);
        assert!(matches!(err, ScalperError::InvalidConfiguration(_)));
        assert!(!err.is_recoverable());
    }
}
