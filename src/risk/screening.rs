use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScreeningQuery {
    pub email: Option<String>,
    pub iban: Option<String>,
    pub phone: Option<String>,
}

impl ScreeningQuery {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.iban.is_none() && self.phone.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreeningResult {
    pub matched: bool,
    #[serde(default)]
    pub list: Option<String>,
}

#[async_trait::async_trait]
pub trait SanctionsScreener: Send + Sync {
    async fn screen(&self, query: &ScreeningQuery) -> Result<ScreeningResult>;
}

pub struct HttpScreener {
    pub client: reqwest::Client,
    pub url: String,
    pub token: String,
    pub timeout: std::time::Duration,
}

#[async_trait::async_trait]
impl SanctionsScreener for HttpScreener {
    async fn screen(&self, query: &ScreeningQuery) -> Result<ScreeningResult> {
        let resp = self
            .client
            .post(&self.url)
            .header("Accept", "application/json")
            .header("x-internal-token", &self.token)
            .json(query)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("screening service returned {}", status);
        }
        Ok(resp.json::<ScreeningResult>().await?)
    }
}

pub struct NoScreening;

#[async_trait::async_trait]
impl SanctionsScreener for NoScreening {
    async fn screen(&self, _query: &ScreeningQuery) -> Result<ScreeningResult> {
        Ok(ScreeningResult::default())
    }
}
