use crate::config::GatewayConfig;
use crate::currency;
use crate::dispatch::{Dispatcher, ProviderReply};
use crate::domain::caller::Caller;
use crate::domain::payment::{FollowUpPayment, PaymentAction, PaymentRequest, RequestMeta, ValidatedPayment};
use crate::domain::verdict::RiskVerdict;
use crate::error::GatewayError;
use crate::notify::{contribution_for, SideEffect, SideEffectQueue};
use crate::providers::{Provider, ProviderSelector};
use crate::risk::RiskGate;
use rust_decimal::Decimal;
use std::sync::Arc;

#[derive(Clone)]
pub struct PaymentService {
    pub config: Arc<GatewayConfig>,
    pub gate: RiskGate,
    pub dispatcher: Dispatcher,
    pub side_effects: SideEffectQueue,
}

impl PaymentService {
    pub async fn initiate(
        &self,
        raw: serde_json::Value,
        caller: Option<&Caller>,
        meta: &RequestMeta,
    ) -> Result<ProviderReply, GatewayError> {
        let payment = validate_initiate(raw)?;

        let evaluation = self.gate.evaluate(&payment, caller).await;
        ensure_allowed(&evaluation.verdict)?;

        let reply = self
            .dispatcher
            .dispatch(&payment, caller, meta, &evaluation.verdict)
            .await?;

        if let Some(caller) = caller {
            if let Some(contribution) = contribution_for(
                &payment.request,
                payment.provider,
                payment.amount,
                &payment.currency.code,
                &reply.body,
                caller,
                &self.config.dispatch.pool_context,
            ) {
                self.side_effects.enqueue(SideEffect::PoolContribution(contribution));
            }
        }

        Ok(reply)
    }

    pub async fn confirm(
        &self,
        raw: serde_json::Value,
        caller: Option<&Caller>,
        meta: &RequestMeta,
    ) -> Result<ProviderReply, GatewayError> {
        self.follow_up(raw, caller, meta, PaymentAction::Confirm).await
    }

    pub async fn cancel(
        &self,
        raw: serde_json::Value,
        caller: Option<&Caller>,
        meta: &RequestMeta,
    ) -> Result<ProviderReply, GatewayError> {
        self.follow_up(raw, caller, meta, PaymentAction::Cancel).await
    }

    async fn follow_up(
        &self,
        raw: serde_json::Value,
        caller: Option<&Caller>,
        meta: &RequestMeta,
        action: PaymentAction,
    ) -> Result<ProviderReply, GatewayError> {
        let payment = validate_follow_up(raw)?;

        let evaluation = self.gate.clear_follow_up(&payment, caller, action).await;
        ensure_allowed(&evaluation.verdict)?;

        self.dispatcher
            .follow_up(&payment, caller, meta, &evaluation.verdict, action)
            .await
    }
}

// Ledger amounts are NUMERIC(20, 4).
const AMOUNT_CEILING: i64 = 1_000_000_000_000_000;
const MAX_AMOUNT_SCALE: u32 = 4;

fn ensure_allowed(verdict: &RiskVerdict) -> Result<(), GatewayError> {
    match verdict {
        RiskVerdict::Allow => Ok(()),
        RiskVerdict::ChallengeRequired { question } => Err(GatewayError::ChallengeRequired {
            question: question.clone(),
        }),
        RiskVerdict::Deny(denial) => Err(GatewayError::Denied(denial.clone())),
    }
}

fn parse_request(raw: &serde_json::Value) -> Result<PaymentRequest, GatewayError> {
    if !raw.is_object() {
        return Err(GatewayError::Validation("request body must be a JSON object".to_string()));
    }
    serde_json::from_value(raw.clone()).map_err(|e| GatewayError::Validation(format!("malformed request: {}", e)))
}

fn select_provider(request: &PaymentRequest) -> Result<Provider, GatewayError> {
    match request.provider_selector() {
        Some(ProviderSelector::Supported(p)) => Ok(p),
        Some(ProviderSelector::Unsupported(key)) => {
            Err(GatewayError::Validation(format!("unsupported provider '{}'", key)))
        }
        None => Err(GatewayError::Validation("provider is required".to_string())),
    }
}

pub fn validate_initiate(raw: serde_json::Value) -> Result<ValidatedPayment, GatewayError> {
    let request = parse_request(&raw)?;
    let provider = select_provider(&request)?;

    let amount = request
        .amount
        .ok_or_else(|| GatewayError::Validation("amount is required".to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(GatewayError::Validation("amount must be greater than zero".to_string()));
    }
    if amount >= Decimal::from(AMOUNT_CEILING) {
        return Err(GatewayError::Validation("amount exceeds the supported maximum".to_string()));
    }
    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Err(GatewayError::Validation(format!(
            "amount supports at most {} decimal places",
            MAX_AMOUNT_SCALE
        )));
    }

    let currency = currency::resolve(
        request.currency.as_deref(),
        request.currency_code.as_deref(),
        request.country.as_deref(),
    )
    .ok_or_else(|| GatewayError::Validation("currency could not be determined".to_string()))?;

    Ok(ValidatedPayment {
        destination: request.destination_target(),
        raw,
        request,
        provider,
        amount,
        currency,
    })
}

pub fn validate_follow_up(raw: serde_json::Value) -> Result<FollowUpPayment, GatewayError> {
    let request = parse_request(&raw)?;
    let provider = select_provider(&request)?;
    let reference = request
        .reference
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Validation("reference is required".to_string()))?;

    Ok(FollowUpPayment {
        raw,
        request,
        provider,
        reference,
    })
}
