//! Exchange rate value types and the collaborators the rate cache depends on

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Price of one unit of the foreign currency in local currency units,
/// together with the instant it was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExchangeRate")]
pub struct ExchangeRate {
    rate: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

// Persisted records go through the same validation as freshly built ones.
#[derive(Deserialize)]
struct RawExchangeRate {
    rate: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

impl TryFrom<RawExchangeRate> for ExchangeRate {
    type Error = anyhow::Error;

    fn try_from(raw: RawExchangeRate) -> Result<Self> {
        ExchangeRate::new(raw.rate, raw.timestamp)
    }
}

impl ExchangeRate {
    pub fn new(rate: f64, timestamp: DateTime<Utc>) -> Result<Self> {
        if !is_valid_rate(rate) {
            bail!("Invalid exchange rate: {rate}");
        }
        Ok(Self { rate, timestamp })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    /// A rate is fresh while its age is strictly below `window`.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.age(now) < window
    }

    /// Same rate, re-stamped with `timestamp`.
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            rate: self.rate,
            timestamp,
        }
    }
}

pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Where a quoted rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    Cached,
    Live,
    Persisted,
    Fallback,
}

impl Display for RateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateOrigin::Cached => "cached",
                RateOrigin::Live => "live",
                RateOrigin::Persisted => "last known",
                RateOrigin::Fallback => "built-in fallback",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateQuote {
    pub rate: f64,
    pub origin: RateOrigin,
    pub as_of: Option<DateTime<Utc>>,
}

impl RateQuote {
    pub fn from_rate(rate: &ExchangeRate, origin: RateOrigin) -> Self {
        Self {
            rate: rate.rate(),
            origin,
            as_of: Some(rate.timestamp()),
        }
    }

    pub fn fallback(rate: f64) -> Self {
        Self {
            rate,
            origin: RateOrigin::Fallback,
            as_of: None,
        }
    }
}

/// A remote endpoint able to supply the rate for the configured pair.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_rate(&self) -> Result<f64>;
}

/// Durable storage for the last accepted rate.
///
/// Implementations swallow their own failures: a failed read is reported as
/// `None` and a failed write is only logged.
#[async_trait]
pub trait RatePersistence: Send + Sync {
    async fn load(&self) -> Option<ExchangeRate>;

    async fn save(&self, rate: &ExchangeRate);
}
