//! Error taxonomy for the scalper library
//!
//! Commands wrap these in `anyhow` with context; library code returns them
//! directly so callers can decide whether a failure skips a session or
//! aborts the run.

use thiserror::Error;

/// Failures from a market-data provider.
///
/// An empty result (holiday, no trading) is not an error: providers return
/// an empty `BarSeries` instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("no data source for {0}")]
    NotFound(String),

    #[error("interval {0} is not supported by this provider")]
    UnsupportedInterval(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

impl From<csv::Error> for ProviderError {
    fn from(err: csv::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ScalperError {
    /// ATR window or box window underfilled; the session yields no trade
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("data provider failure: {0}")]
    DataProvider(#[from] ProviderError),

    #[error("signal publish failed: {0}")]
    Publish(String),

    #[error("cannot {action} while session is {state}")]
    InvalidTransition { state: String, action: &'static str },
}

impl ScalperError {
    /// True when the caller should skip the current session/symbol and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScalperError::InsufficientData(_)
                | ScalperError::DataProvider(_)
                | ScalperError::Publish(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScalperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(ScalperError::InsufficientData("atr".into()).is_recoverable());
        assert!(ScalperError::DataProvider(ProviderError::Unreachable("timeout".into())).is_recoverable());
        assert!(!ScalperError::InvalidConfiguration("interval".into()).is_recoverable());
        assert!(!ScalperError::InvalidTransition {
            state: "UNINITIALIZED".into(),
            action: "scan",
        }
        .is_recoverable());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Api {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "provider returned HTTP 403: forbidden");
    }
}
