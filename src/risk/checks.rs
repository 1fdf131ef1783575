use crate::config::{Blacklist, RiskPolicy};
use crate::domain::caller::{AccountKind, Caller};
use crate::domain::payment::{amount_json, Destination, ValidatedPayment};
use crate::domain::verdict::{Denial, DenyReason};
use crate::ledger::VelocityStats;
use crate::providers::ProviderPolicy;
use rust_decimal::Decimal;
use serde_json::json;

/// Pipeline stages in evaluation order. The gate stops at the first stage
/// that halts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Identity,
    Kyc,
    Sanctions,
    Blacklist,
    RiskyCountry,
    TransactionLimit,
    DailyLimit,
    StepUp,
    Velocity,
    CurrencyAllowList,
    MlScore,
}

impl Check {
    pub const PIPELINE: [Check; 11] = [
        Check::Identity,
        Check::Kyc,
        Check::Sanctions,
        Check::Blacklist,
        Check::RiskyCountry,
        Check::TransactionLimit,
        Check::DailyLimit,
        Check::StepUp,
        Check::Velocity,
        Check::CurrencyAllowList,
        Check::MlScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Check::Identity => "identity",
            Check::Kyc => "kyc",
            Check::Sanctions => "sanctions",
            Check::Blacklist => "blacklist",
            Check::RiskyCountry => "risky_country",
            Check::TransactionLimit => "transaction_limit",
            Check::DailyLimit => "daily_limit",
            Check::StepUp => "step_up",
            Check::Velocity => "velocity",
            Check::CurrencyAllowList => "currency_allow_list",
            Check::MlScore => "ml_score",
        }
    }
}

#[derive(Debug)]
pub enum Halt {
    Deny(Denial),
    Challenge(String),
    System(anyhow::Error),
}

impl From<Denial> for Halt {
    fn from(d: Denial) -> Self {
        Halt::Deny(d)
    }
}

pub fn identity(caller: Option<&Caller>) -> Result<&Caller, Denial> {
    caller
        .filter(|c| c.has_subject())
        .ok_or_else(|| Denial::new(DenyReason::Unauthenticated))
}

pub fn kyc(caller: &Caller, policy: &RiskPolicy) -> Result<(), Denial> {
    match &caller.account {
        AccountKind::Individual { kyc_level } if *kyc_level < policy.min_kyc_level => Err(Denial::with_details(
            DenyReason::KycInsufficient,
            json!({ "required": policy.min_kyc_level, "current": kyc_level }),
        )),
        AccountKind::Business { kyb_status }
            if !kyb_status
                .as_deref()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case(&policy.validated_kyb_status)) =>
        {
            Err(Denial::new(DenyReason::KybInsufficient))
        }
        _ => Ok(()),
    }
}

pub fn blacklist(destination: Option<&Destination>, list: &Blacklist) -> Result<(), Denial> {
    let hit = match destination {
        Some(Destination::Email(e)) => list.emails.contains(e),
        Some(Destination::Iban(i)) => list.ibans.contains(i),
        Some(Destination::Phone { number, .. }) => list.phones.contains(number),
        Some(Destination::Internal(_)) | None => false,
    };
    if hit {
        return Err(Denial::new(DenyReason::Blacklist));
    }
    Ok(())
}

pub fn destination_country(payment: &ValidatedPayment) -> Option<String> {
    payment
        .request
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .or_else(|| payment.destination.as_ref().and_then(Destination::country_hint))
}

pub fn risky_country(payment: &ValidatedPayment, policy: &RiskPolicy) -> Result<(), Denial> {
    match destination_country(payment) {
        Some(country) if policy.risky_countries.contains(&country) => Err(Denial::with_details(
            DenyReason::RiskyCountry,
            json!({ "country": country }),
        )),
        _ => Ok(()),
    }
}

pub fn transaction_limit(payment: &ValidatedPayment, provider: &ProviderPolicy) -> Result<(), Denial> {
    match provider.transaction_limit(&payment.currency) {
        Some(max) if payment.amount > max => Err(Denial::with_details(
            DenyReason::LimitExceeded,
            json!({
                "max": amount_json(max),
                "currency": payment.currency.code,
                "symbol": payment.currency.symbol,
            }),
        )),
        _ => Ok(()),
    }
}

pub fn daily_limit(
    payment: &ValidatedPayment,
    provider: &ProviderPolicy,
    stats: &VelocityStats,
) -> Result<(), Denial> {
    match provider.daily_limit(&payment.currency) {
        Some(max) if stats.daily_total + payment.amount > max => Err(Denial::with_details(
            DenyReason::DailyLimitExceeded,
            json!({
                "max": amount_json(max),
                "dailyTotal": amount_json(stats.daily_total),
                "currency": payment.currency.code,
                "symbol": payment.currency.symbol,
            }),
        )),
        _ => Ok(()),
    }
}

pub fn step_up(
    payment: &ValidatedPayment,
    caller: &Caller,
    daily_limit: Option<Decimal>,
    ratio: Decimal,
) -> Result<(), Halt> {
    let Some(limit) = daily_limit else {
        return Ok(());
    };
    if payment.amount < limit * ratio {
        return Ok(());
    }
    let Some(default_question) = caller.challenge_question() else {
        return Ok(());
    };

    let answer = payment
        .request
        .security_answer
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());
    let Some(answer) = answer else {
        return Err(Halt::Challenge(default_question.question.clone()));
    };

    let question = match payment.request.security_question.as_deref() {
        Some(q) => caller.find_question(q),
        None => Some(default_question),
    };
    match question {
        Some(q) if q.accepts(answer) => Ok(()),
        _ => Err(Denial::new(DenyReason::ChallengeFailed).into()),
    }
}

pub fn velocity(stats: &VelocityStats, policy: &RiskPolicy) -> Result<(), Denial> {
    if stats.hourly_count > policy.max_hourly_transactions {
        return Err(Denial::with_details(
            DenyReason::VelocityHourly,
            json!({ "count": stats.hourly_count, "max": policy.max_hourly_transactions }),
        ));
    }
    if stats.same_destination_count > policy.max_same_destination {
        return Err(Denial::with_details(
            DenyReason::StructuringPattern,
            json!({
                "count": stats.same_destination_count,
                "max": policy.max_same_destination,
                "windowMinutes": policy.structuring_window.num_minutes(),
            }),
        ));
    }
    Ok(())
}

pub fn currency_allowed(payment: &ValidatedPayment, provider: &ProviderPolicy) -> Result<(), Denial> {
    if provider.accepts_currency(&payment.currency) {
        return Ok(());
    }
    let mut allowed: Vec<String> = provider
        .allowed_currencies
        .iter()
        .flatten()
        .cloned()
        .collect();
    allowed.sort();
    Err(Denial::with_details(
        DenyReason::CurrencyNotAllowed,
        json!({ "currency": payment.currency.code, "allowed": allowed }),
    ))
}

pub fn ml_score(score: f64, policy: &RiskPolicy) -> Result<(), Denial> {
    if score >= policy.ml_deny_threshold {
        return Err(Denial::with_details(
            DenyReason::MlHighRisk,
            json!({ "score": score, "threshold": policy.ml_deny_threshold }),
        ));
    }
    Ok(())
}
