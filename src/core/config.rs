use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::{debug, warn};

/// Rate used when no source answers and nothing was ever persisted.
///
/// Approximate EUR/RSD as of early 2026. Review periodically, it drifts from
/// the real rate over time.
pub const DEFAULT_FALLBACK_RATE: f64 = 117.5;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_FRESHNESS_SECS: u64 = 60 * 60;

/// Replaced with `currency.foreign` in source URLs.
pub const FOREIGN_PLACEHOLDER: &str = "{foreign}";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CurrencyConfig {
    pub local: String,
    pub foreign: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            local: "RSD".to_string(),
            foreign: "EUR".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RatesConfig {
    /// Endpoints tried in order; the first valid answer wins.
    pub sources: Vec<String>,
    pub timeout_ms: u64,
    pub freshness_secs: u64,
    pub fallback_rate: f64,
    /// When every source fails, treat the stored rate as acquired now instead
    /// of keeping its stored timestamp. Loading at startup never restamps.
    pub refresh_persisted_timestamp: bool,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            sources: vec![
                "https://api.exchangerate-api.com/v4/latest/{foreign}".to_string(),
                "https://open.er-api.com/v6/latest/{foreign}".to_string(),
            ],
            timeout_ms: DEFAULT_TIMEOUT_MS,
            freshness_secs: DEFAULT_FRESHNESS_SECS,
            fallback_rate: DEFAULT_FALLBACK_RATE,
            refresh_persisted_timestamp: false,
        }
    }
}

impl RatesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Source URLs with the foreign currency code filled in.
    pub fn source_urls(&self, currency: &CurrencyConfig) -> Vec<String> {
        self.sources
            .iter()
            .map(|url| url.replace(FOREIGN_PLACEHOLDER, currency.foreign.trim()))
            .collect()
    }

    pub fn freshness(&self) -> chrono::Duration {
        let secs = i64::try_from(self.freshness_secs).unwrap_or(i64::MAX);
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub currency: CurrencyConfig,
    pub rates: RatesConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config at the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("rs", "moneystack", "moneystack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("rs", "moneystack", "moneystack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency.local.trim().is_empty() || self.currency.foreign.trim().is_empty() {
            bail!("Currency codes must not be empty");
        }
        if !(self.rates.fallback_rate.is_finite() && self.rates.fallback_rate > 0.0) {
            bail!(
                "fallback_rate must be a positive number, got {}",
                self.rates.fallback_rate
            );
        }
        if self.rates.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        if self.rates.freshness_secs == 0 {
            bail!("freshness_secs must be greater than zero");
        }
        for url in self.mismatched_sources() {
            warn!(
                url,
                foreign = %self.currency.foreign,
                "Rate source looks like it quotes a different base currency"
            );
        }
        Ok(())
    }

    /// Fixed source URLs whose last path segment names a currency other
    /// than `currency.foreign`.
    pub fn mismatched_sources(&self) -> Vec<&str> {
        let foreign = self.currency.foreign.trim();
        self.rates
            .sources
            .iter()
            .filter(|url| !url.contains(FOREIGN_PLACEHOLDER))
            .filter(|url| {
                let last = url
                    .split(['?', '#'])
                    .next()
                    .unwrap_or_default()
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or_default();
                last.len() == 3
                    && last.chars().all(|c| c.is_ascii_alphabetic())
                    && !last.eq_ignore_ascii_case(foreign)
            })
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency:
  local: "RSD"
  foreign: "EUR"
rates:
  sources:
    - "http://example.com/latest/EUR"
  timeout_ms: 2500
  freshness_secs: 600
  fallback_rate: 116.9
  refresh_persisted_timestamp: true
data_path: "/tmp/moneystack"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency.local, "RSD");
        assert_eq!(config.currency.foreign, "EUR");
        assert_eq!(config.rates.sources, vec!["http://example.com/latest/EUR"]);
        assert_eq!(config.rates.timeout(), Duration::from_millis(2500));
        assert_eq!(config.rates.freshness(), chrono::Duration::minutes(10));
        assert_eq!(config.rates.fallback_rate, 116.9);
        assert!(config.rates.refresh_persisted_timestamp);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/moneystack")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = serde_yaml::from_str("rates:\n  timeout_ms: 1000\n").unwrap();
        assert_eq!(config.currency, CurrencyConfig::default());
        assert_eq!(config.rates.timeout_ms, 1000);
        assert_eq!(config.rates.sources.len(), 2);
        assert_eq!(config.rates.fallback_rate, DEFAULT_FALLBACK_RATE);
        assert_eq!(config.rates.freshness(), chrono::Duration::hours(1));
        assert!(!config.rates.refresh_persisted_timestamp);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.validate().unwrap();

        config.rates.fallback_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rates.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.currency.foreign = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_sources_follow_foreign_currency() {
        let mut config = AppConfig::default();
        config.currency.foreign = "USD".to_string();

        let urls = config.rates.source_urls(&config.currency);
        assert_eq!(
            urls,
            vec![
                "https://api.exchangerate-api.com/v4/latest/USD",
                "https://open.er-api.com/v6/latest/USD",
            ]
        );
        assert!(config.mismatched_sources().is_empty());
    }

    #[test]
    fn test_fixed_source_for_other_currency_is_flagged() {
        let mut config = AppConfig::default();
        config.currency.foreign = "USD".to_string();
        config.rates.sources = vec![
            "http://example.com/latest/EUR".to_string(),
            "http://example.com/latest/usd/".to_string(),
            "http://127.0.0.1:8080/rates".to_string(),
        ];

        assert_eq!(
            config.mismatched_sources(),
            vec!["http://example.com/latest/EUR"]
        );
        // Only a warning, the config is still usable.
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from_path(dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
