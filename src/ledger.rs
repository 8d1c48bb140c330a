use crate::core::category::{Category, Transaction, TransactionKind};
use crate::core::store::{KeyValueCollection, get_json, put_json};
use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

pub const CATEGORIES_COLLECTION: &str = "categories";

/// Category records kept in a store collection, keyed by category id.
pub struct Ledger {
    collection: Arc<dyn KeyValueCollection>,
}

impl Ledger {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    /// All categories, oldest first.
    pub async fn list(&self) -> Result<Vec<Category>> {
        let mut categories = Vec::new();
        for (key, bytes) in self.collection.entries().await? {
            let category: Category = serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to decode category: {key}"))?;
            categories.push(category);
        }
        categories.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(categories)
    }

    pub async fn get(&self, name: &str) -> Result<Option<Category>> {
        get_json(self.collection.as_ref(), &Category::id_for(name)).await
    }

    async fn require(&self, name: &str) -> Result<Category> {
        self.get(name)
            .await?
            .ok_or_else(|| anyhow!("Category not found: {}", name.trim()))
    }

    /// Creates a category; a non-zero `initial_balance` is recorded as its
    /// first transaction.
    pub async fn create(&self, name: &str, initial_balance: f64) -> Result<Category> {
        if name.trim().is_empty() {
            bail!("Category name must not be empty");
        }
        if !initial_balance.is_finite() {
            bail!("Invalid initial balance: {initial_balance}");
        }
        if self.get(name).await?.is_some() {
            bail!("Category already exists: {}", name.trim());
        }

        let now = Utc::now();
        let mut category = Category::new(name, now);
        if initial_balance != 0.0 {
            let kind = if initial_balance > 0.0 {
                TransactionKind::Add
            } else {
                TransactionKind::Subtract
            };
            category.apply(Transaction {
                amount: initial_balance.abs(),
                kind,
                timestamp: now,
                note: Some("Initial balance".to_string()),
            });
        }

        put_json(self.collection.as_ref(), &category.id, &category).await?;
        info!(category = %category.name, balance = category.balance, "Created category");
        Ok(category)
    }

    pub async fn record(
        &self,
        name: &str,
        kind: TransactionKind,
        amount: f64,
        note: Option<String>,
    ) -> Result<Category> {
        if !(amount.is_finite() && amount > 0.0) {
            bail!("Amount must be a positive number, got {amount}");
        }

        let mut category = self.require(name).await?;
        category.apply(Transaction {
            amount,
            kind,
            timestamp: Utc::now(),
            note: note.filter(|n| !n.trim().is_empty()),
        });

        put_json(self.collection.as_ref(), &category.id, &category).await?;
        debug!(category = %category.name, %kind, amount, "Recorded transaction");
        Ok(category)
    }

    pub async fn delete(&self, name: &str) -> Result<Category> {
        let category = self.require(name).await?;
        self.collection.remove(&category.id).await?;
        info!(category = %category.name, "Deleted category");
        Ok(category)
    }

    pub async fn total_balance(&self) -> Result<f64> {
        Ok(self.list().await?.iter().map(|c| c.balance).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;

    fn new_ledger() -> Ledger {
        Ledger::new(Arc::new(MemoryCollection::new()))
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let ledger = new_ledger();
        ledger.create("Cash", 0.0).await.unwrap();
        ledger.create("Savings", 5000.0).await.unwrap();

        let categories = ledger.list().await.unwrap();
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Cash", "Savings"]);
        assert!(categories[0].transactions.is_empty());
        assert_eq!(categories[1].balance, 5000.0);
        assert_eq!(categories[1].transactions.len(), 1);
        assert_eq!(ledger.total_balance().await.unwrap(), 5000.0);
    }

    #[tokio::test]
    async fn test_negative_initial_balance() {
        let ledger = new_ledger();
        let category = ledger.create("Loan", -300.0).await.unwrap();
        assert_eq!(category.balance, -300.0);
        assert_eq!(category.transactions[0].kind, TransactionKind::Subtract);
        assert_eq!(category.transactions[0].amount, 300.0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let ledger = new_ledger();
        assert!(ledger.create("   ", 0.0).await.is_err());
        assert!(ledger.create("Cash", f64::NAN).await.is_err());

        ledger.create("Cash", 0.0).await.unwrap();
        let err = ledger.create("cash", 10.0).await.unwrap_err();
        assert_eq!(err.to_string(), "Category already exists: cash");
    }

    #[tokio::test]
    async fn test_record_transactions() {
        let ledger = new_ledger();
        ledger.create("Cash", 100.0).await.unwrap();

        ledger
            .record("cash", TransactionKind::Add, 50.0, Some("salary".to_string()))
            .await
            .unwrap();
        let category = ledger
            .record("CASH", TransactionKind::Subtract, 200.0, Some(" ".to_string()))
            .await
            .unwrap();

        assert_eq!(category.balance, -50.0);
        assert_eq!(category.transactions.len(), 3);
        assert_eq!(category.transactions[1].note.as_deref(), Some("salary"));
        assert!(category.transactions[2].note.is_none());

        let stored = ledger.get("Cash").await.unwrap().unwrap();
        assert_eq!(stored.balance, -50.0);
        assert_eq!(stored.transactions.len(), 3);
    }

    #[tokio::test]
    async fn test_record_rejects_bad_amounts_and_unknown_categories() {
        let ledger = new_ledger();
        ledger.create("Cash", 0.0).await.unwrap();

        for amount in [0.0, -5.0, f64::INFINITY] {
            assert!(
                ledger
                    .record("Cash", TransactionKind::Add, amount, None)
                    .await
                    .is_err()
            );
        }

        let err = ledger
            .record("Wallet", TransactionKind::Add, 1.0, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Category not found: Wallet");
    }

    #[tokio::test]
    async fn test_delete() {
        let ledger = new_ledger();
        ledger.create("Cash", 10.0).await.unwrap();
        ledger.create("Savings", 20.0).await.unwrap();

        let deleted = ledger.delete("cash").await.unwrap();
        assert_eq!(deleted.name, "Cash");
        assert!(ledger.get("Cash").await.unwrap().is_none());
        assert_eq!(ledger.total_balance().await.unwrap(), 20.0);
        assert!(ledger.delete("Cash").await.is_err());
    }
}
