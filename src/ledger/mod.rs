use crate::domain::audit::AuditRecord;
use crate::domain::transaction::{TransactionRecord, TransactionStatus};
use crate::repo::audit_repo::AuditRepo;
use crate::repo::transactions_repo::TransactionsRepo;
use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod in_memory;

pub use in_memory::InMemoryLedger;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityStats {
    pub hourly_count: i64,
    pub daily_total: Decimal,
    pub same_destination_count: i64,
}

#[derive(Debug, Clone)]
pub struct VelocityQuery {
    pub user_id: String,
    pub provider: String,
    pub currency: String,
    pub destination: Option<String>,
    pub hourly_since: DateTime<Utc>,
    pub daily_since: DateTime<Utc>,
    pub destination_since: DateTime<Utc>,
}

impl VelocityQuery {
    pub fn earliest(&self) -> DateTime<Utc> {
        self.hourly_since.min(self.daily_since).min(self.destination_since)
    }
}

#[async_trait::async_trait]
pub trait RiskLedger: Send + Sync {
    async fn append_audit(&self, record: AuditRecord) -> Result<()>;

    async fn velocity_stats(&self, query: &VelocityQuery) -> Result<VelocityStats>;
}

#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert_transaction(&self, record: TransactionRecord) -> Result<()>;

    /// Updates the transaction whose `reference`, `meta.reference` or `meta.id`
    /// matches. Returns whether a record was found.
    async fn update_by_reference(
        &self,
        reference: &str,
        status: TransactionStatus,
        meta: serde_json::Value,
    ) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgLedger {
    pub audit_repo: AuditRepo,
    pub transactions_repo: TransactionsRepo,
}

#[async_trait::async_trait]
impl RiskLedger for PgLedger {
    async fn append_audit(&self, record: AuditRecord) -> Result<()> {
        self.audit_repo.insert(&record).await
    }

    async fn velocity_stats(&self, query: &VelocityQuery) -> Result<VelocityStats> {
        self.transactions_repo.velocity(query).await
    }
}

#[async_trait::async_trait]
impl TransactionStore for PgLedger {
    async fn insert_transaction(&self, record: TransactionRecord) -> Result<()> {
        self.transactions_repo.insert(&record).await
    }

    async fn update_by_reference(
        &self,
        reference: &str,
        status: TransactionStatus,
        meta: serde_json::Value,
    ) -> Result<bool> {
        self.transactions_repo
            .update_by_reference(reference, status, meta)
            .await
    }
}
