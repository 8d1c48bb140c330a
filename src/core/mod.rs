//! Core business logic abstractions

pub mod category;
pub mod config;
pub mod convert;
pub mod log;
pub mod rate;
pub mod store;

// Re-export main types for cleaner imports
pub use category::{Category, Transaction, TransactionKind};
pub use convert::Direction;
pub use rate::{ExchangeRate, RateOrigin, RatePersistence, RateQuote, RateSource};
