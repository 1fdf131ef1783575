use crate::config::{DispatchPolicy, GatewayConfig};
use crate::domain::audit::{mask_snapshot, AuditEvent, AuditRecord};
use crate::domain::caller::{ledger_user_id, Caller};
use crate::domain::payment::{
    Destination, FollowUpPayment, PaymentAction, PaymentRequest, RequestMeta, ValidatedPayment,
};
use crate::domain::transaction::{meta_object, TransactionRecord, TransactionStatus};
use crate::domain::verdict::RiskVerdict;
use crate::error::GatewayError;
use crate::ledger::{RiskLedger, TransactionStore};
use crate::providers::Provider;
use chrono::Utc;
use classify::{classify, DispatchOutcome, Exchange};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod classify;
pub mod fees;
pub mod headers;

#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub status: u16,
    pub body: serde_json::Value,
}

#[derive(Clone)]
pub struct Dispatcher {
    pub config: Arc<GatewayConfig>,
    pub client: reqwest::Client,
    pub transactions: Arc<dyn TransactionStore>,
    pub ledger: Arc<dyn RiskLedger>,
}

pub fn timeout_for(provider: Provider, request: &PaymentRequest, policy: &DispatchPolicy) -> Duration {
    if provider == Provider::Wallet || request.is_context(&policy.pool_context) {
        policy.extended_timeout
    } else {
        policy.default_timeout
    }
}

impl Dispatcher {
    pub async fn dispatch(
        &self,
        payment: &ValidatedPayment,
        caller: Option<&Caller>,
        meta: &RequestMeta,
        verdict: &RiskVerdict,
    ) -> Result<ProviderReply, GatewayError> {
        if !verdict.is_allow() {
            return Err(anyhow::anyhow!("dispatch attempted without an allow verdict").into());
        }

        let provider = payment.provider;
        let user_id = ledger_user_id(caller);
        let url = self.config.registry.policy(provider).url(PaymentAction::Initiate);
        let fee = fees::gateway_fee(payment, &self.config.dispatch);
        let body = fees::with_fee(&payment.raw, fee.as_ref());
        let headers = headers::outbound(meta, &user_id, &self.config.internal_service_token);
        let budget = timeout_for(provider, &payment.request, &self.config.dispatch);

        tracing::info!(
            request_id = %headers.request_id,
            provider = provider.key(),
            timeout_secs = budget.as_secs(),
            "dispatching payment"
        );
        let outcome = classify(self.send(&url, headers.map, &body, budget).await);

        let now = Utc::now();
        let (status, reference, error_message, tx_meta) = match &outcome {
            DispatchOutcome::Accepted {
                body,
                reference,
                status_label,
                ..
            } => (
                TransactionStatus::from_provider(status_label.as_deref()),
                reference.clone(),
                None,
                body.clone(),
            ),
            DispatchOutcome::Challenge { .. } => (
                TransactionStatus::Challenged,
                None,
                Some("upstream anti-bot challenge".to_string()),
                serde_json::Value::Null,
            ),
            DispatchOutcome::Rejected { message, body, .. } => {
                (TransactionStatus::Failed, None, Some(message.clone()), body.clone())
            }
            DispatchOutcome::TimedOut => (
                TransactionStatus::Failed,
                None,
                Some(format!("{} timed out", provider.key())),
                serde_json::Value::Null,
            ),
            DispatchOutcome::Unavailable => (
                TransactionStatus::Failed,
                None,
                Some(format!("{} unreachable", provider.key())),
                serde_json::Value::Null,
            ),
        };

        let record = TransactionRecord {
            id: Uuid::new_v4(),
            user_id: user_id.clone(),
            provider: provider.key().to_string(),
            amount: payment.amount,
            currency: payment.currency.code.clone(),
            destination: payment.destination.as_ref().map(Destination::key),
            status,
            reference,
            request_id: headers.request_id.clone(),
            error_message,
            meta: meta_object(tx_meta),
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.transactions.insert_transaction(record).await {
            tracing::error!(request_id = %headers.request_id, "failed to record transaction: {:#}", e);
        }

        self.audit(AuditRecord {
            id: Uuid::new_v4(),
            user_id,
            event_type: AuditEvent::Dispatch,
            provider: provider.key().to_string(),
            amount: Some(payment.amount),
            currency: Some(payment.currency.code.clone()),
            destination: payment.destination.as_ref().map(Destination::masked),
            flagged: false,
            flag_reason: None,
            outcome: Some(outcome.label().to_string()),
            snapshot: mask_snapshot(&payment.raw),
            trail: serde_json::json!({ "requestId": headers.request_id, "action": "initiate" }),
            created_at: now,
        })
        .await;

        into_reply(provider, &headers.request_id, outcome)
    }

    pub async fn follow_up(
        &self,
        payment: &FollowUpPayment,
        caller: Option<&Caller>,
        meta: &RequestMeta,
        verdict: &RiskVerdict,
        action: PaymentAction,
    ) -> Result<ProviderReply, GatewayError> {
        if !verdict.is_allow() {
            return Err(anyhow::anyhow!("{} attempted without an allow verdict", action.as_str()).into());
        }

        let provider = payment.provider;
        let user_id = ledger_user_id(caller);
        let url = self.config.registry.policy(provider).url(action);
        let headers = headers::outbound(meta, &user_id, &self.config.internal_service_token);
        let budget = timeout_for(provider, &payment.request, &self.config.dispatch);

        tracing::info!(
            request_id = %headers.request_id,
            provider = provider.key(),
            action = action.as_str(),
            "forwarding follow-up"
        );
        let outcome = classify(self.send(&url, headers.map, &payment.raw, budget).await);

        if let DispatchOutcome::Accepted { body, status_label, .. } = &outcome {
            let status = match status_label.as_deref() {
                Some(label) => TransactionStatus::from_provider(Some(label)),
                None if action == PaymentAction::Cancel => TransactionStatus::Cancelled,
                None => TransactionStatus::Succeeded,
            };
            match self
                .transactions
                .update_by_reference(&payment.reference, status, meta_object(body.clone()))
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::warn!(
                    request_id = %headers.request_id,
                    reference = %payment.reference,
                    "no stored transaction matches reference"
                ),
                Err(e) => tracing::error!(
                    request_id = %headers.request_id,
                    "failed to update transaction: {:#}",
                    e
                ),
            }
        }

        self.audit(AuditRecord {
            id: Uuid::new_v4(),
            user_id,
            event_type: AuditEvent::Dispatch,
            provider: provider.key().to_string(),
            amount: None,
            currency: None,
            destination: None,
            flagged: false,
            flag_reason: None,
            outcome: Some(outcome.label().to_string()),
            snapshot: mask_snapshot(&payment.raw),
            trail: serde_json::json!({
                "requestId": headers.request_id,
                "action": action.as_str(),
                "reference": payment.reference,
            }),
            created_at: Utc::now(),
        })
        .await;

        into_reply(provider, &headers.request_id, outcome)
    }

    async fn send(
        &self,
        url: &str,
        headers: reqwest::header::HeaderMap,
        body: &serde_json::Value,
        budget: Duration,
    ) -> Exchange {
        let call = async {
            let resp = self
                .client
                .post(url)
                .headers(headers)
                .json(body)
                .timeout(budget)
                .send()
                .await?;
            let status = resp.status().as_u16();
            let text = resp.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        match tokio::time::timeout(budget, call).await {
            Err(_) => Exchange::TimedOut,
            Ok(Ok((status, body))) => Exchange::Reply { status, body },
            Ok(Err(e)) if e.is_timeout() => Exchange::TimedOut,
            Ok(Err(e)) => {
                tracing::warn!(url, "provider call failed: {}", e);
                Exchange::NoResponse
            }
        }
    }

    async fn audit(&self, record: AuditRecord) {
        let id = record.id;
        if let Err(e) = self.ledger.append_audit(record).await {
            tracing::error!(audit_id = %id, "failed to write audit record: {:#}", e);
        }
    }
}

fn into_reply(provider: Provider, request_id: &str, outcome: DispatchOutcome) -> Result<ProviderReply, GatewayError> {
    let name = provider.display_name().to_string();
    match outcome {
        DispatchOutcome::Accepted { status, body, .. } => Ok(ProviderReply { status, body }),
        DispatchOutcome::Challenge { status } => {
            tracing::warn!(request_id, provider = provider.key(), status, "provider behind anti-bot challenge");
            Err(GatewayError::UpstreamChallenge { provider: name })
        }
        DispatchOutcome::Rejected { status, message, .. } => {
            tracing::warn!(request_id, provider = provider.key(), status, "provider rejected request");
            Err(GatewayError::UpstreamError {
                provider: name,
                status: if status >= 400 { status } else { 502 },
                message,
            })
        }
        DispatchOutcome::TimedOut => {
            tracing::warn!(request_id, provider = provider.key(), "provider timed out");
            Err(GatewayError::UpstreamTimeout { provider: name })
        }
        DispatchOutcome::Unavailable => Err(GatewayError::UpstreamUnavailable { provider: name }),
    }
}
