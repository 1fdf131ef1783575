use crate::domain::audit::AuditRecord;
use crate::domain::transaction::{matches_reference, meta_object, TransactionRecord, TransactionStatus};
use crate::ledger::{RiskLedger, TransactionStore, VelocityQuery, VelocityStats};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default, Clone)]
pub struct InMemoryLedger {
    audits: Arc<RwLock<Vec<AuditRecord>>>,
    transactions: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audits.read().await.clone()
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.read().await.clone()
    }
}

#[async_trait::async_trait]
impl RiskLedger for InMemoryLedger {
    async fn append_audit(&self, record: AuditRecord) -> Result<()> {
        self.audits.write().await.push(record);
        Ok(())
    }

    async fn velocity_stats(&self, query: &VelocityQuery) -> Result<VelocityStats> {
        let txs = self.transactions.read().await;
        let mut stats = VelocityStats::default();

        for tx in txs.iter().filter(|t| {
            t.user_id == query.user_id && t.provider == query.provider && t.status.counts_toward_velocity()
        }) {
            if tx.created_at >= query.hourly_since {
                stats.hourly_count += 1;
            }
            if tx.created_at >= query.daily_since && tx.currency == query.currency {
                stats.daily_total = stats
                    .daily_total
                    .checked_add(tx.amount)
                    .ok_or_else(|| anyhow::anyhow!("daily total overflowed for {}", query.user_id))?;
            }
            if tx.created_at >= query.destination_since
                && query.destination.is_some()
                && tx.destination == query.destination
            {
                stats.same_destination_count += 1;
            }
        }

        Ok(stats)
    }
}

#[async_trait::async_trait]
impl TransactionStore for InMemoryLedger {
    async fn insert_transaction(&self, mut record: TransactionRecord) -> Result<()> {
        record.meta = meta_object(record.meta);
        self.transactions.write().await.push(record);
        Ok(())
    }

    async fn update_by_reference(
        &self,
        reference: &str,
        status: TransactionStatus,
        meta: serde_json::Value,
    ) -> Result<bool> {
        let mut txs = self.transactions.write().await;
        match txs.iter_mut().find(|t| matches_reference(t, reference)) {
            Some(tx) => {
                tx.status = status;
                let mut merged = meta_object(std::mem::take(&mut tx.meta));
                if let (Some(existing), serde_json::Value::Object(update)) =
                    (merged.as_object_mut(), meta_object(meta))
                {
                    existing.extend(update);
                }
                tx.meta = merged;
                tx.updated_at = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn tx(user: &str, amount: Decimal, status: TransactionStatus, age: Duration, dest: &str) -> TransactionRecord {
        let at = Utc::now() - age;
        TransactionRecord {
            id: Uuid::new_v4(),
            user_id: user.to_string(),
            provider: "stripe".to_string(),
            amount,
            currency: "EUR".to_string(),
            destination: Some(dest.to_string()),
            status,
            reference: None,
            request_id: "r".to_string(),
            error_message: None,
            meta: serde_json::json!({"id": format!("ref-{}", amount)}),
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn stats_respect_windows_and_skip_failed() {
        let ledger = InMemoryLedger::new();
        let s = TransactionStatus::Pending;
        ledger.insert_transaction(tx("u1", dec!(100), s, Duration::minutes(5), "a@x.io")).await.unwrap();
        ledger.insert_transaction(tx("u1", dec!(50), s, Duration::minutes(90), "a@x.io")).await.unwrap();
        ledger
            .insert_transaction(tx("u1", dec!(999), TransactionStatus::Failed, Duration::minutes(1), "a@x.io"))
            .await
            .unwrap();
        ledger.insert_transaction(tx("u2", dec!(70), s, Duration::minutes(1), "a@x.io")).await.unwrap();

        let now = Utc::now();
        let stats = ledger
            .velocity_stats(&VelocityQuery {
                user_id: "u1".to_string(),
                provider: "stripe".to_string(),
                currency: "EUR".to_string(),
                destination: Some("a@x.io".to_string()),
                hourly_since: now - Duration::hours(1),
                daily_since: now - Duration::hours(24),
                destination_since: now - Duration::minutes(10),
            })
            .await
            .unwrap();

        assert_eq!(stats.hourly_count, 1);
        assert_eq!(stats.daily_total, dec!(150));
        assert_eq!(stats.same_destination_count, 1);
    }

    #[tokio::test]
    async fn overflowing_daily_total_is_an_error() {
        let ledger = InMemoryLedger::new();
        let huge = Decimal::MAX - dec!(1);
        let s = TransactionStatus::Succeeded;
        ledger.insert_transaction(tx("u1", huge, s, Duration::minutes(1), "a@x.io")).await.unwrap();
        ledger.insert_transaction(tx("u1", huge, s, Duration::minutes(2), "a@x.io")).await.unwrap();

        let now = Utc::now();
        let result = ledger
            .velocity_stats(&VelocityQuery {
                user_id: "u1".to_string(),
                provider: "stripe".to_string(),
                currency: "EUR".to_string(),
                destination: None,
                hourly_since: now - Duration::hours(1),
                daily_since: now - Duration::hours(24),
                destination_since: now - Duration::minutes(10),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn updates_by_meta_id() {
        let ledger = InMemoryLedger::new();
        ledger
            .insert_transaction(tx("u1", dec!(10), TransactionStatus::Pending, Duration::zero(), "d"))
            .await
            .unwrap();
        let found = ledger
            .update_by_reference("ref-10", TransactionStatus::Succeeded, serde_json::Value::Null)
            .await
            .unwrap();
        assert!(found);
        assert_eq!(ledger.transactions().await[0].status, TransactionStatus::Succeeded);
        assert!(!ledger
            .update_by_reference("nope", TransactionStatus::Cancelled, serde_json::Value::Null)
            .await
            .unwrap());
    }
}
