//! Money categories and the transactions recorded against them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Add,
    Subtract,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TransactionKind::Add => "add",
                TransactionKind::Subtract => "subtract",
            }
        )
    }
}

/// Amounts are always positive and in the local currency; `kind` gives the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    pub kind: TransactionKind,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Transaction {
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Add => self.amount,
            TransactionKind::Subtract => -self.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub transactions: Vec<Transaction>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Identifier derived from a display name; lookups are case-insensitive.
    pub fn id_for(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn new(name: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Self::id_for(name),
            name: name.trim().to_string(),
            balance: 0.0,
            transactions: Vec::new(),
            created_at,
        }
    }

    pub fn apply(&mut self, transaction: Transaction) {
        self.balance += transaction.signed_amount();
        self.transactions.push(transaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_updates_balance() {
        let now = Utc::now();
        let mut category = Category::new("  Savings ", now);
        assert_eq!(category.id, "savings");
        assert_eq!(category.name, "Savings");

        category.apply(Transaction {
            amount: 1000.0,
            kind: TransactionKind::Add,
            timestamp: now,
            note: None,
        });
        category.apply(Transaction {
            amount: 250.5,
            kind: TransactionKind::Subtract,
            timestamp: now,
            note: Some("groceries".to_string()),
        });

        assert_eq!(category.balance, 749.5);
        assert_eq!(category.transactions.len(), 2);
    }
}
