use crate::ledger::VelocityStats;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    KycInsufficient,
    KybInsufficient,
    Sanctioned,
    Blacklist,
    RiskyCountry,
    LimitExceeded,
    DailyLimitExceeded,
    ChallengeFailed,
    VelocityHourly,
    StructuringPattern,
    CurrencyNotAllowed,
    MlHighRisk,
    SystemError,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::KycInsufficient => "kyc_insufficient",
            DenyReason::KybInsufficient => "kyb_insufficient",
            DenyReason::Sanctioned => "sanctioned",
            DenyReason::Blacklist => "blacklist",
            DenyReason::RiskyCountry => "risky_country",
            DenyReason::LimitExceeded => "limit_exceeded",
            DenyReason::DailyLimitExceeded => "daily_limit_exceeded",
            DenyReason::ChallengeFailed => "challenge_failed",
            DenyReason::VelocityHourly => "velocity_hourly",
            DenyReason::StructuringPattern => "structuring_pattern",
            DenyReason::CurrencyNotAllowed => "currency_not_allowed",
            DenyReason::MlHighRisk => "ml_high_risk",
            DenyReason::SystemError => "system_error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "Authentication required",
            DenyReason::KycInsufficient => "Identity verification level is insufficient for this transaction",
            DenyReason::KybInsufficient => "Business verification must be validated before transacting",
            DenyReason::Sanctioned => "Transaction blocked by compliance screening",
            DenyReason::Blacklist => "Destination is not allowed",
            DenyReason::RiskyCountry => "Destination country is not supported",
            DenyReason::LimitExceeded => "Amount exceeds the per-transaction limit",
            DenyReason::DailyLimitExceeded => "Amount exceeds the daily limit",
            DenyReason::ChallengeFailed => "Security answer is incorrect",
            DenyReason::VelocityHourly => "Too many transactions in the last hour",
            DenyReason::StructuringPattern => "Too many transactions to the same destination",
            DenyReason::CurrencyNotAllowed => "Currency is not accepted by this provider",
            DenyReason::MlHighRisk => "Transaction flagged as high risk",
            DenyReason::SystemError => "Risk evaluation failed, transaction refused",
        }
    }

    pub fn status(&self) -> axum::http::StatusCode {
        match self {
            DenyReason::Unauthenticated => axum::http::StatusCode::UNAUTHORIZED,
            DenyReason::SystemError => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            _ => axum::http::StatusCode::FORBIDDEN,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Denial {
    pub reason: DenyReason,
    pub details: Option<serde_json::Value>,
}

impl Denial {
    pub fn new(reason: DenyReason) -> Self {
        Self { reason, details: None }
    }

    pub fn with_details(reason: DenyReason, details: serde_json::Value) -> Self {
        Self {
            reason,
            details: Some(details),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum RiskVerdict {
    Allow,
    ChallengeRequired { question: String },
    Deny(Denial),
}

impl RiskVerdict {
    pub fn is_allow(&self) -> bool {
        matches!(self, RiskVerdict::Allow)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationTrail {
    pub checks: Vec<&'static str>,
    pub stats: Option<VelocityStats>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub verdict: RiskVerdict,
    pub trail: EvaluationTrail,
}
