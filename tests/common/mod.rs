#![allow(dead_code)]

use chrono::{Duration, Utc};
use payments_dispatcher::config::GatewayConfig;
use payments_dispatcher::dispatch::Dispatcher;
use payments_dispatcher::domain::caller::{AccountKind, Caller, SecurityQuestion};
use payments_dispatcher::domain::transaction::{TransactionRecord, TransactionStatus};
use payments_dispatcher::ledger::{InMemoryLedger, TransactionStore};
use payments_dispatcher::notify::{SideEffect, SideEffectQueue};
use payments_dispatcher::providers::{ProviderRegistry, ProviderUrls};
use payments_dispatcher::risk::{NoScreening, RiskGate, RiskScorer, SanctionsScreener, ScoreFeatures};
use payments_dispatcher::service::payment_service::PaymentService;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub const TOKEN: &str = "test-internal-token";

pub struct Setup {
    pub config: GatewayConfig,
    pub screener: Arc<dyn SanctionsScreener>,
    pub scorer: Option<Arc<dyn RiskScorer>>,
}

pub struct Harness {
    pub config: Arc<GatewayConfig>,
    pub ledger: InMemoryLedger,
    pub gate: RiskGate,
    pub dispatcher: Dispatcher,
    pub service: PaymentService,
    pub effects: Option<mpsc::Receiver<SideEffect>>,
}

impl Setup {
    pub fn new(provider_base: &str) -> Self {
        Self {
            config: GatewayConfig::new(
                ProviderRegistry::with_defaults(ProviderUrls::uniform(provider_base)),
                TOKEN,
            ),
            screener: Arc::new(NoScreening),
            scorer: None,
        }
    }

    /// Side effects land on a channel the test can inspect.
    pub fn build(self) -> Harness {
        let (queue, rx) = SideEffectQueue::channel(64);
        let mut h = self.build_with_queue(queue);
        h.effects = Some(rx);
        h
    }

    pub fn build_with_queue(self, queue: SideEffectQueue) -> Harness {
        let config = Arc::new(self.config);
        let ledger = InMemoryLedger::new();
        let gate = RiskGate {
            config: config.clone(),
            ledger: Arc::new(ledger.clone()),
            screener: self.screener,
            scorer: self.scorer,
            side_effects: queue.clone(),
        };
        let dispatcher = Dispatcher {
            config: config.clone(),
            client: reqwest::Client::new(),
            transactions: Arc::new(ledger.clone()),
            ledger: Arc::new(ledger.clone()),
        };
        let service = PaymentService {
            config: config.clone(),
            gate: gate.clone(),
            dispatcher: dispatcher.clone(),
            side_effects: queue,
        };
        Harness {
            config,
            ledger,
            gate,
            dispatcher,
            service,
            effects: None,
        }
    }
}

impl Harness {
    pub fn drain_effects(&mut self) -> Vec<SideEffect> {
        let mut out = Vec::new();
        if let Some(rx) = self.effects.as_mut() {
            while let Ok(effect) = rx.try_recv() {
                out.push(effect);
            }
        }
        out
    }

    pub async fn seed(&self, user: &str, amount: Decimal, destination: &str, minutes_ago: i64) {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        self.ledger
            .insert_transaction(TransactionRecord {
                id: Uuid::new_v4(),
                user_id: user.to_string(),
                provider: "stripe".to_string(),
                amount,
                currency: "EUR".to_string(),
                destination: Some(destination.to_string()),
                status: TransactionStatus::Succeeded,
                reference: None,
                request_id: Uuid::new_v4().to_string(),
                error_message: None,
                meta: serde_json::json!({}),
                created_at: at,
                updated_at: at,
            })
            .await
            .unwrap();
    }
}

pub fn individual(subject: &str, kyc_level: u8) -> Caller {
    Caller {
        subject_id: subject.to_string(),
        display_name: Some("Awa Diop".to_string()),
        role: "user".to_string(),
        account: AccountKind::Individual { kyc_level },
        security_questions: vec![],
    }
}

pub fn business(subject: &str, kyb_status: Option<&str>) -> Caller {
    Caller {
        subject_id: subject.to_string(),
        display_name: Some("Acme SARL".to_string()),
        role: "merchant".to_string(),
        account: AccountKind::Business {
            kyb_status: kyb_status.map(str::to_string),
        },
        security_questions: vec![],
    }
}

pub fn with_question(mut caller: Caller, question: &str, answer: &str) -> Caller {
    caller.security_questions.push(SecurityQuestion {
        question: question.to_string(),
        answer: answer.to_string(),
    });
    caller
}

pub struct FixedScore(pub f64);

#[async_trait::async_trait]
impl RiskScorer for FixedScore {
    async fn score(&self, _features: &ScoreFeatures) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

pub struct FailingScorer;

#[async_trait::async_trait]
impl RiskScorer for FailingScorer {
    async fn score(&self, _features: &ScoreFeatures) -> anyhow::Result<f64> {
        anyhow::bail!("scorer exploded")
    }
}

/// Polls until the mock server has seen `n` requests or the deadline passes.
pub async fn wait_for_requests(server: &wiremock::MockServer, n: usize) -> Vec<wiremock::Request> {
    for _ in 0..50 {
        let received = server.received_requests().await.unwrap_or_default();
        if received.len() >= n {
            return received;
        }
        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
    }
    server.received_requests().await.unwrap_or_default()
}
