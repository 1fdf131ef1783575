use crate::domain::caller::Caller;
use crate::domain::payment::PaymentRequest;
use crate::providers::Provider;
use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolContribution {
    #[serde(skip)]
    pub pool_id: String,
    pub amount: f64,
    pub currency: String,
    pub contributor_name: String,
    pub status: String,
    pub provider: String,
    pub external_reference: Option<String>,
    pub participation_code: Option<String>,
}

// Wallet payments settle inside the pool service already.
pub fn contribution_for(
    request: &PaymentRequest,
    provider: Provider,
    amount: Decimal,
    currency: &str,
    provider_body: &serde_json::Value,
    caller: &Caller,
    pool_context: &str,
) -> Option<PoolContribution> {
    if provider == Provider::Wallet || !request.is_context(pool_context) {
        return None;
    }
    let pool_id = request
        .pool_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())?;

    let data = provider_body.get("data").unwrap_or(provider_body);
    let field = |name: &str| {
        data.get(name)
            .or_else(|| provider_body.get(name))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    Some(PoolContribution {
        pool_id: pool_id.to_string(),
        amount: amount.to_f64().unwrap_or_default(),
        currency: currency.to_string(),
        contributor_name: caller
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string()),
        status: field("status").unwrap_or_else(|| "pending".to_string()),
        provider: provider.key().to_string(),
        external_reference: field("reference").or_else(|| field("id")),
        participation_code: request.participation_code.clone(),
    })
}

#[derive(Clone)]
pub struct PoolNotifier {
    pub client: reqwest::Client,
    pub base_url: Option<String>,
    pub token: String,
    pub timeout: std::time::Duration,
}

impl PoolNotifier {
    pub async fn notify(&self, contribution: &PoolContribution) -> Result<()> {
        let Some(base) = &self.base_url else {
            tracing::debug!(pool_id = %contribution.pool_id, "pool service not configured, skipping");
            return Ok(());
        };

        let url = format!(
            "{}/pools/{}/contributions",
            base.trim_end_matches('/'),
            contribution.pool_id
        );
        let resp = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .header("x-gateway-token", &self.token)
            .json(contribution)
            .timeout(self.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            anyhow::bail!("pool service returned {}", resp.status());
        }
        Ok(())
    }
}
