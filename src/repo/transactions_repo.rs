use crate::domain::transaction::{meta_object, TransactionRecord, TransactionStatus};
use crate::ledger::{VelocityQuery, VelocityStats};
use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct TransactionsRepo {
    pub pool: PgPool,
}

impl TransactionsRepo {
    pub async fn insert(&self, record: &TransactionRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, provider, amount, currency, destination, status,
                reference, request_id, error_message, meta, created_at, updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.provider)
        .bind(record.amount)
        .bind(&record.currency)
        .bind(&record.destination)
        .bind(record.status.as_str())
        .bind(&record.reference)
        .bind(&record.request_id)
        .bind(&record.error_message)
        .bind(meta_object(record.meta.clone()))
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_by_reference(
        &self,
        reference: &str,
        status: TransactionStatus,
        meta: serde_json::Value,
    ) -> Result<bool> {
        let meta = meta_object(meta);
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET status = $2, meta = meta || $3, updated_at = now()
            WHERE id = (
                SELECT id FROM transactions
                WHERE reference = $1 OR meta->>'reference' = $1 OR meta->>'id' = $1
                ORDER BY created_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(reference)
        .bind(status.as_str())
        .bind(meta)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn velocity(&self, q: &VelocityQuery) -> Result<VelocityStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE created_at >= $4) AS hourly_count,
                COALESCE(SUM(amount) FILTER (WHERE created_at >= $5 AND currency = $3), 0) AS daily_total,
                COUNT(*) FILTER (
                    WHERE created_at >= $6 AND $7::text IS NOT NULL AND destination = $7
                ) AS same_destination_count
            FROM transactions
            WHERE user_id = $1
              AND provider = $2
              AND status NOT IN ('failed', 'challenged')
              AND created_at >= $8
            "#,
        )
        .bind(&q.user_id)
        .bind(&q.provider)
        .bind(&q.currency)
        .bind(q.hourly_since)
        .bind(q.daily_since)
        .bind(q.destination_since)
        .bind(&q.destination)
        .bind(q.earliest())
        .fetch_one(&self.pool)
        .await?;

        Ok(VelocityStats {
            hourly_count: row.get("hourly_count"),
            daily_total: row.get::<Decimal, _>("daily_total"),
            same_destination_count: row.get("same_destination_count"),
        })
    }
}
