pub mod cli;
pub mod core;
pub mod ledger;
pub mod providers;
pub mod store;

use crate::core::TransactionKind;
use crate::core::config::AppConfig;
use crate::core::convert::Direction;
use crate::core::store::Store;
use crate::ledger::{CATEGORIES_COLLECTION, Ledger};
use crate::providers::caching::{RateCache, RateCacheSettings};
use crate::store::KeyValueStore;
use crate::store::rate::{RATES_COLLECTION, StoredRatePersistence};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rate,
    Convert {
        amount: f64,
        direction: Direction,
    },
    List,
    Add {
        name: String,
        initial: f64,
        foreign: bool,
    },
    Record {
        name: String,
        kind: TransactionKind,
        amount: f64,
        note: Option<String>,
        foreign: bool,
    },
    History {
        name: String,
    },
    Remove {
        name: String,
    },
}

impl AppCommand {
    fn needs_rate(&self) -> bool {
        match self {
            AppCommand::Rate | AppCommand::Convert { .. } | AppCommand::List => true,
            AppCommand::Add { foreign, .. } | AppCommand::Record { foreign, .. } => *foreign,
            AppCommand::History { .. } | AppCommand::Remove { .. } => false,
        }
    }
}

/// Everything a command needs, wired from the config.
pub struct App {
    pub config: AppConfig,
    pub ledger: Ledger,
    pub rates: RateCache,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let store = match config.default_data_path() {
            Ok(data_path) => KeyValueStore::open(&data_path.join("store"))?,
            Err(e) => {
                warn!(error = %e, "No data directory, nothing will be saved");
                KeyValueStore::in_memory()
            }
        };
        Self::with_store(config, &store)
    }

    pub fn with_store(config: AppConfig, store: &dyn Store) -> Result<Self> {
        let sources = providers::sources_from_config(&config)?;
        let persistence = StoredRatePersistence::new(store.collection(RATES_COLLECTION)?);
        let rates = RateCache::new(
            sources,
            Arc::new(persistence),
            RateCacheSettings::from(&config.rates),
        );
        let ledger = Ledger::new(store.collection(CATEGORIES_COLLECTION)?);

        Ok(Self {
            config,
            ledger,
            rates,
        })
    }

    pub async fn execute(&self, command: AppCommand) -> Result<()> {
        if command.needs_rate() {
            // The refresh is shared with whatever rate lookup the command makes.
            let _refresh = self.rates.initialize_cache().await;
        }

        match command {
            AppCommand::Rate => cli::rate::run(self).await,
            AppCommand::Convert { amount, direction } => {
                cli::rate::run_convert(self, amount, direction).await
            }
            AppCommand::List => cli::categories::run_list(self).await,
            AppCommand::Add {
                name,
                initial,
                foreign,
            } => cli::categories::run_add(self, &name, initial, foreign).await,
            AppCommand::Record {
                name,
                kind,
                amount,
                note,
                foreign,
            } => cli::categories::run_record(self, &name, kind, amount, note, foreign).await,
            AppCommand::History { name } => cli::categories::run_history(self, &name).await,
            AppCommand::Remove { name } => cli::categories::run_remove(self, &name).await,
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("moneystack starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::new(config).context("Failed to open application data")?;
    app.execute(command).await
}
