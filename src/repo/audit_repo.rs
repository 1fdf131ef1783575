use crate::domain::audit::AuditRecord;
use anyhow::Result;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AuditRepo {
    pub pool: PgPool,
}

impl AuditRepo {
    pub async fn insert(&self, record: &AuditRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id, user_id, event_type, provider, amount, currency, destination,
                flagged, flag_reason, outcome, snapshot, trail, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(record.event_type.as_str())
        .bind(&record.provider)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(&record.destination)
        .bind(record.flagged)
        .bind(&record.flag_reason)
        .bind(&record.outcome)
        .bind(&record.snapshot)
        .bind(&record.trail)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
