use crate::currency::ResolvedCurrency;
use crate::providers::{Provider, ProviderSelector};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub iban: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default, alias = "cagnotteId")]
    pub pool_id: Option<String>,
    #[serde(default)]
    pub participation_code: Option<String>,
    #[serde(default)]
    pub security_question: Option<String>,
    #[serde(default)]
    pub security_answer: Option<String>,
    #[serde(default, alias = "transactionId")]
    pub reference: Option<String>,
}

impl PaymentRequest {
    pub fn provider_selector(&self) -> Option<ProviderSelector> {
        self.provider
            .as_deref()
            .or(self.destination.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProviderSelector::parse)
    }

    pub fn destination_target(&self) -> Option<Destination> {
        if let Some(email) = non_empty(&self.email) {
            return Some(Destination::Email(email.to_lowercase()));
        }
        if let Some(iban) = non_empty(&self.iban) {
            return Some(Destination::Iban(iban.replace(' ', "").to_uppercase()));
        }
        if let Some(phone) = non_empty(&self.phone) {
            return Some(Destination::Phone {
                number: phone.replace(' ', ""),
                operator: non_empty(&self.operator).map(ToString::to_string),
            });
        }
        non_empty(&self.target_id).map(|t| Destination::Internal(t.to_string()))
    }

    pub fn is_context(&self, tag: &str) -> bool {
        self.context
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(tag))
    }
}

pub fn amount_json(d: Decimal) -> serde_json::Value {
    use rust_decimal::prelude::ToPrimitive;

    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return serde_json::Value::from(i);
        }
    }
    d.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(d.to_string()))
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Email(String),
    Iban(String),
    Phone { number: String, operator: Option<String> },
    Internal(String),
}

impl Destination {
    pub fn key(&self) -> String {
        match self {
            Destination::Email(e) => e.clone(),
            Destination::Iban(i) => i.clone(),
            Destination::Phone { number, .. } => number.clone(),
            Destination::Internal(t) => format!("internal:{}", t),
        }
    }

    pub fn masked(&self) -> String {
        match self {
            Destination::Email(e) => crate::domain::audit::mask_email(e),
            Destination::Iban(i) => crate::domain::audit::mask_tail(i, 4, 4),
            Destination::Phone { number, .. } => crate::domain::audit::mask_tail(number, 0, 4),
            Destination::Internal(t) => format!("internal:{}", t),
        }
    }

    pub fn country_hint(&self) -> Option<String> {
        match self {
            Destination::Iban(i) => {
                let prefix: String = i.chars().take(2).collect();
                (prefix.len() == 2 && prefix.chars().all(|c| c.is_ascii_alphabetic())).then_some(prefix)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedPayment {
    pub raw: serde_json::Value,
    pub request: PaymentRequest,
    pub provider: Provider,
    pub amount: Decimal,
    pub currency: ResolvedCurrency,
    pub destination: Option<Destination>,
}

#[derive(Debug, Clone)]
pub struct FollowUpPayment {
    pub raw: serde_json::Value,
    pub request: PaymentRequest,
    pub provider: Provider,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Initiate,
    Confirm,
    Cancel,
}

impl PaymentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentAction::Initiate => "initiate",
            PaymentAction::Confirm => "confirm",
            PaymentAction::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub correlation_id: Option<String>,
    pub authorization: Option<String>,
    pub session_id: Option<String>,
    pub device_id: Option<String>,
}

impl RequestMeta {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            correlation_id: get("x-request-id").or_else(|| get("x-correlation-id")),
            authorization: get("authorization"),
            session_id: get("x-session-id"),
            device_id: get("x-device-id"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_prefers_email_then_iban() {
        let req = PaymentRequest {
            email: Some(" Jane@Example.com ".to_string()),
            iban: Some("FR76 3000 6000 0112 3456 7890 189".to_string()),
            ..Default::default()
        };
        assert_eq!(
            req.destination_target(),
            Some(Destination::Email("jane@example.com".to_string()))
        );

        let req = PaymentRequest {
            iban: Some("fr76 3000 6000 0112 3456 7890 189".to_string()),
            ..Default::default()
        };
        let dest = req.destination_target().unwrap();
        assert_eq!(dest.key(), "FR7630006000011234567890189");
        assert_eq!(dest.country_hint().as_deref(), Some("FR"));
    }

    #[test]
    fn legacy_destination_field_selects_provider() {
        let req: PaymentRequest =
            serde_json::from_value(serde_json::json!({"destination": "paypal", "amount": 10})).unwrap();
        assert_eq!(
            req.provider_selector(),
            Some(ProviderSelector::Supported(Provider::Paypal))
        );
    }

    #[test]
    fn pool_alias_is_accepted() {
        let req: PaymentRequest =
            serde_json::from_value(serde_json::json!({"cagnotteId": "pool-9", "context": "Cagnotte"})).unwrap();
        assert_eq!(req.pool_id.as_deref(), Some("pool-9"));
        assert!(req.is_context("cagnotte"));
    }
}
