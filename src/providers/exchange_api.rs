use crate::core::rate::{RateSource, is_valid_rate};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// A "latest rates" endpoint quoting every currency against the foreign one,
/// e.g. `https://open.er-api.com/v6/latest/EUR` returning `{"rates": {"RSD": 117.2}}`.
pub struct ExchangeApiSource {
    url: String,
    currency: String,
    client: reqwest::Client,
}

impl ExchangeApiSource {
    /// `currency` is the code looked up under `rates`; `timeout` bounds the
    /// whole request, body included.
    pub fn new(url: &str, currency: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("moneystack/1.0")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            url: url.to_string(),
            currency: currency.to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, RateValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RateValue {
    Number(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl RateValue {
    fn to_rate(&self) -> Option<f64> {
        let rate = match self {
            RateValue::Number(n) => *n,
            RateValue::Text(s) => s.trim().parse::<f64>().ok()?,
            RateValue::Other(_) => return None,
        };
        is_valid_rate(rate).then_some(rate)
    }
}

#[async_trait]
impl RateSource for ExchangeApiSource {
    fn name(&self) -> &str {
        &self.url
    }

    #[instrument(name = "ExchangeApiFetch", skip(self), fields(url = %self.url))]
    async fn fetch_rate(&self) -> Result<f64> {
        debug!("Requesting exchange rate");

        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, self.url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for URL: {}",
                response.status(),
                self.url
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response from {}: {}", self.url, e))?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response from {}: {}", self.url, e))?;

        let value = data
            .rates
            .get(&self.currency)
            .ok_or_else(|| anyhow!("No {} rate found in response from {}", self.currency, self.url))?;

        value.to_rate().ok_or_else(|| {
            anyhow!(
                "Invalid {} rate {:?} in response from {}",
                self.currency,
                value,
                self.url
            )
        })
    }
}
