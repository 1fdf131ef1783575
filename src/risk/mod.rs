use crate::config::GatewayConfig;
use crate::domain::audit::{mask_snapshot, AuditEvent, AuditRecord};
use crate::domain::caller::{ledger_user_id as user_id, Caller};
use crate::domain::payment::{Destination, FollowUpPayment, PaymentAction, ValidatedPayment};
use crate::domain::verdict::{Denial, DenyReason, Evaluation, EvaluationTrail, RiskVerdict};
use crate::ledger::{RiskLedger, VelocityQuery, VelocityStats};
use crate::notify::{FraudAlert, SideEffect, SideEffectQueue};
use crate::providers::ProviderPolicy;
use checks::{Check, Halt};
use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use uuid::Uuid;

pub mod checks;
pub mod scorer;
pub mod screening;

pub use scorer::{HttpRiskScorer, RiskScorer, ScoreFeatures};
pub use screening::{HttpScreener, NoScreening, SanctionsScreener, ScreeningQuery};

#[derive(Clone)]
pub struct RiskGate {
    pub config: Arc<GatewayConfig>,
    pub ledger: Arc<dyn RiskLedger>,
    pub screener: Arc<dyn SanctionsScreener>,
    pub scorer: Option<Arc<dyn RiskScorer>>,
    pub side_effects: SideEffectQueue,
}

struct Attempt<'a> {
    payment: &'a ValidatedPayment,
    caller: Option<&'a Caller>,
    provider: &'a ProviderPolicy,
    trail: EvaluationTrail,
}

impl Attempt<'_> {
    fn subject(&self) -> Result<&Caller, Halt> {
        checks::identity(self.caller).map_err(Halt::Deny)
    }
}

impl RiskGate {
    /// Runs every check in order and stops at the first one that halts.
    /// Exactly one audit record is written per call, whatever the outcome.
    pub async fn evaluate(&self, payment: &ValidatedPayment, caller: Option<&Caller>) -> Evaluation {
        let mut attempt = Attempt {
            payment,
            caller,
            provider: self.config.registry.policy(payment.provider),
            trail: EvaluationTrail::default(),
        };

        let verdict = match self.run_pipeline(&mut attempt).await {
            Ok(()) => RiskVerdict::Allow,
            Err(halt) => verdict_for(halt),
        };

        let evaluation = Evaluation {
            verdict,
            trail: attempt.trail,
        };
        let record = AuditRecord {
            id: Uuid::new_v4(),
            user_id: user_id(caller),
            event_type: AuditEvent::Initiate,
            provider: payment.provider.key().to_string(),
            amount: Some(payment.amount),
            currency: Some(payment.currency.code.clone()),
            destination: payment.destination.as_ref().map(Destination::masked),
            flagged: false,
            flag_reason: None,
            outcome: None,
            snapshot: mask_snapshot(&payment.raw),
            trail: serde_json::to_value(&evaluation.trail).unwrap_or_default(),
            created_at: Utc::now(),
        };
        self.conclude(record, &evaluation.verdict).await;
        evaluation
    }

    pub async fn clear_follow_up(
        &self,
        payment: &FollowUpPayment,
        caller: Option<&Caller>,
        action: PaymentAction,
    ) -> Evaluation {
        let mut trail = EvaluationTrail::default();
        trail.checks.push(Check::Identity.name());
        let verdict = match checks::identity(caller) {
            Ok(_) => RiskVerdict::Allow,
            Err(denial) => RiskVerdict::Deny(denial),
        };

        let evaluation = Evaluation { verdict, trail };
        let record = AuditRecord {
            id: Uuid::new_v4(),
            user_id: user_id(caller),
            event_type: match action {
                PaymentAction::Cancel => AuditEvent::Cancel,
                _ => AuditEvent::Confirm,
            },
            provider: payment.provider.key().to_string(),
            amount: None,
            currency: None,
            destination: None,
            flagged: false,
            flag_reason: None,
            outcome: None,
            snapshot: mask_snapshot(&payment.raw),
            trail: serde_json::to_value(&evaluation.trail).unwrap_or_default(),
            created_at: Utc::now(),
        };
        self.conclude(record, &evaluation.verdict).await;
        evaluation
    }

    async fn run_pipeline(&self, attempt: &mut Attempt<'_>) -> Result<(), Halt> {
        for check in Check::PIPELINE {
            attempt.trail.checks.push(check.name());
            self.run_check(check, attempt).await?;
        }
        Ok(())
    }

    async fn run_check(&self, check: Check, attempt: &mut Attempt<'_>) -> Result<(), Halt> {
        let policy = &self.config.risk;
        let payment = attempt.payment;

        match check {
            Check::Identity => attempt.subject().map(|_| ()),
            Check::Kyc => Ok(checks::kyc(attempt.subject()?, policy)?),
            Check::Sanctions => self.screen(payment).await,
            Check::Blacklist => Ok(checks::blacklist(payment.destination.as_ref(), &policy.blacklist)?),
            Check::RiskyCountry => Ok(checks::risky_country(payment, policy)?),
            Check::TransactionLimit => Ok(checks::transaction_limit(payment, attempt.provider)?),
            Check::DailyLimit => {
                let stats = self.stats(attempt).await?;
                Ok(checks::daily_limit(payment, attempt.provider, &stats)?)
            }
            Check::StepUp => checks::step_up(
                payment,
                attempt.subject()?,
                attempt.provider.daily_limit(&payment.currency),
                policy.step_up_ratio,
            ),
            Check::Velocity => {
                let stats = self.stats(attempt).await?;
                Ok(checks::velocity(&stats, policy)?)
            }
            Check::CurrencyAllowList => Ok(checks::currency_allowed(payment, attempt.provider)?),
            Check::MlScore => {
                let Some(scorer) = &self.scorer else {
                    return Ok(());
                };
                let stats = self.stats(attempt).await?;
                let features = ScoreFeatures {
                    user_id: user_id(attempt.caller),
                    provider: payment.provider.key().to_string(),
                    amount: payment.amount.to_f64().unwrap_or_default(),
                    currency: payment.currency.code.clone(),
                    hourly_count: stats.hourly_count,
                    daily_total: stats.daily_total.to_f64().unwrap_or_default(),
                    same_destination_count: stats.same_destination_count,
                    destination_country: checks::destination_country(payment),
                };
                let score = scorer.score(&features).await.map_err(Halt::System)?;
                attempt.trail.score = Some(score);
                Ok(checks::ml_score(score, policy)?)
            }
        }
    }

    async fn screen(&self, payment: &ValidatedPayment) -> Result<(), Halt> {
        let mut query = ScreeningQuery::default();
        match &payment.destination {
            Some(Destination::Email(e)) => query.email = Some(e.clone()),
            Some(Destination::Iban(i)) => query.iban = Some(i.clone()),
            Some(Destination::Phone { number, .. }) => query.phone = Some(number.clone()),
            Some(Destination::Internal(_)) | None => {}
        }
        if query.is_empty() {
            return Ok(());
        }

        let result = self.screener.screen(&query).await.map_err(Halt::System)?;
        if result.matched {
            return Err(Halt::Deny(Denial::with_details(
                DenyReason::Sanctioned,
                serde_json::json!({ "list": result.list }),
            )));
        }
        Ok(())
    }

    /// Loaded at most once per evaluation and never cached across requests.
    async fn stats(&self, attempt: &mut Attempt<'_>) -> Result<VelocityStats, Halt> {
        if let Some(stats) = &attempt.trail.stats {
            return Ok(stats.clone());
        }

        let now = Utc::now();
        let payment = attempt.payment;
        let query = VelocityQuery {
            user_id: user_id(attempt.caller),
            provider: payment.provider.key().to_string(),
            currency: payment.currency.code.clone(),
            destination: payment.destination.as_ref().map(Destination::key),
            hourly_since: now - Duration::hours(1),
            daily_since: now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|d| d.and_utc())
                .unwrap_or(now - Duration::hours(24)),
            destination_since: now - self.config.risk.structuring_window,
        };

        let stats = self.ledger.velocity_stats(&query).await.map_err(Halt::System)?;
        attempt.trail.stats = Some(stats.clone());
        Ok(stats)
    }

    async fn conclude(&self, mut record: AuditRecord, verdict: &RiskVerdict) {
        match verdict {
            RiskVerdict::Allow => record.outcome = Some("allow".to_string()),
            RiskVerdict::ChallengeRequired { .. } => {
                record.outcome = Some("challenge_required".to_string());
            }
            RiskVerdict::Deny(denial) => {
                record.outcome = Some("deny".to_string());
                record.flagged = true;
                record.flag_reason = Some(denial.reason.code().to_string());
                tracing::warn!(
                    user_id = %record.user_id,
                    provider = %record.provider,
                    event = record.event_type.as_str(),
                    reason = denial.reason.code(),
                    "risk gate denied request"
                );
                self.side_effects.enqueue(SideEffect::FraudAlert(FraudAlert {
                    user_id: record.user_id.clone(),
                    reason: denial.reason.code().to_string(),
                    provider: record.provider.clone(),
                    amount: record.amount,
                    currency: record.currency.clone(),
                    destination: record.destination.clone(),
                    details: denial.details.clone(),
                    snapshot: record.snapshot.clone(),
                    raised_at: record.created_at,
                }));
            }
        }

        let id = record.id;
        if let Err(e) = self.ledger.append_audit(record).await {
            tracing::error!(audit_id = %id, "failed to write audit record: {:#}", e);
        }
    }
}

fn verdict_for(halt: Halt) -> RiskVerdict {
    match halt {
        Halt::Deny(denial) => RiskVerdict::Deny(denial),
        Halt::Challenge(question) => RiskVerdict::ChallengeRequired { question },
        Halt::System(e) => {
            tracing::error!("risk pipeline failed, denying: {:#}", e);
            RiskVerdict::Deny(Denial::new(DenyReason::SystemError))
        }
    }
}
