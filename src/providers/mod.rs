pub mod caching;
pub mod exchange_api;

use crate::core::config::AppConfig;
use crate::core::rate::RateSource;
use anyhow::Result;
use exchange_api::ExchangeApiSource;
use std::sync::Arc;

/// Builds the configured rate sources, in priority order.
pub fn sources_from_config(config: &AppConfig) -> Result<Vec<Arc<dyn RateSource>>> {
    config
        .rates
        .source_urls(&config.currency)
        .iter()
        .map(|url| {
            ExchangeApiSource::new(url, &config.currency.local, config.rates.timeout())
                .map(|source| Arc::new(source) as Arc<dyn RateSource>)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_use_configured_foreign_currency() {
        let mut config = AppConfig::default();
        config.currency.foreign = "CHF".to_string();

        let sources = sources_from_config(&config).unwrap();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "https://api.exchangerate-api.com/v4/latest/CHF",
                "https://open.er-api.com/v6/latest/CHF",
            ]
        );
    }
}
