use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FraudAlert {
    pub user_id: String,
    pub reason: String,
    pub provider: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub destination: Option<String>,
    pub details: Option<serde_json::Value>,
    pub snapshot: serde_json::Value,
    pub raised_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AlertDispatcher {
    pub client: reqwest::Client,
    pub webhook_url: Option<String>,
    pub token: String,
}

impl AlertDispatcher {
    pub async fn emit(&self, alert: &FraudAlert) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::warn!(
                user_id = %alert.user_id,
                reason = %alert.reason,
                provider = %alert.provider,
                "fraud alert (no webhook configured)"
            );
            return Ok(());
        };

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Event-Type", "fraud.alert")
            .header("x-internal-token", &self.token)
            .json(alert)
            .timeout(std::time::Duration::from_secs(10))
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("alert webhook returned {}", resp.status());
        }
        Ok(())
    }
}
