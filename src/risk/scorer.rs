use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ScoreFeatures {
    pub user_id: String,
    pub provider: String,
    pub amount: f64,
    pub currency: String,
    pub hourly_count: i64,
    pub daily_total: f64,
    pub same_destination_count: i64,
    pub destination_country: Option<String>,
}

#[async_trait::async_trait]
pub trait RiskScorer: Send + Sync {
    async fn score(&self, features: &ScoreFeatures) -> Result<f64>;
}

#[derive(Deserialize)]
struct ScoreReply {
    score: f64,
}

pub struct HttpRiskScorer {
    pub client: reqwest::Client,
    pub url: String,
    pub token: String,
    pub timeout: std::time::Duration,
}

#[async_trait::async_trait]
impl RiskScorer for HttpRiskScorer {
    async fn score(&self, features: &ScoreFeatures) -> Result<f64> {
        let resp = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .header("x-internal-token", &self.token)
            .json(features)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("risk scorer returned {}", status);
        }
        let reply = resp.json::<ScoreReply>().await?;
        if !reply.score.is_finite() {
            anyhow::bail!("risk scorer returned a non-finite score");
        }
        Ok(reply.score)
    }
}
