use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Initiate,
    Confirm,
    Cancel,
    Dispatch,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Initiate => "initiate",
            AuditEvent::Confirm => "confirm",
            AuditEvent::Cancel => "cancel",
            AuditEvent::Dispatch => "dispatch",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub user_id: String,
    pub event_type: AuditEvent,
    pub provider: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub destination: Option<String>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub outcome: Option<String>,
    pub snapshot: Value,
    pub trail: Value,
    pub created_at: DateTime<Utc>,
}

const DROPPED_KEYS: &[&str] = &[
    "cvc",
    "cvv",
    "cvv2",
    "securitycode",
    "otp",
    "otpcode",
    "password",
    "pin",
    "securityanswer",
];

const CARD_NUMBER_KEYS: &[&str] = &["cardnumber", "pan", "cardno"];

fn normalize_key(k: &str) -> String {
    k.chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_lowercase()
}

/// Redacts credentials from a request body before it is stored or sent in an
/// alert. Card numbers keep their last four digits, secrets are dropped.
pub fn mask_snapshot(value: &Value) -> Value {
    mask_value(value, false)
}

fn mask_value(value: &Value, in_card: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                let key = normalize_key(k);
                if DROPPED_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let masked = if CARD_NUMBER_KEYS.contains(&key.as_str()) || (in_card && key == "number") {
                    match v {
                        Value::String(s) => Value::String(mask_card_number(s)),
                        Value::Number(n) => Value::String(mask_card_number(&n.to_string())),
                        _ => Value::Null,
                    }
                } else if key == "iban" {
                    v.as_str()
                        .map(|s| Value::String(mask_tail(&s.replace(' ', ""), 4, 4)))
                        .unwrap_or(Value::Null)
                } else {
                    mask_value(v, in_card || key.contains("card"))
                };
                out.insert(k.clone(), masked);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| mask_value(v, in_card)).collect()),
        other => other.clone(),
    }
}

pub fn mask_card_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let tail: String = digits.chars().skip(digits.len().saturating_sub(4)).collect();
    format!("****{}", tail)
}

pub fn mask_tail(raw: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = raw.chars().collect();
    if chars.len() <= head + tail {
        return "*".repeat(chars.len());
    }
    let start: String = chars[..head].iter().collect();
    let end: String = chars[chars.len() - tail..].iter().collect();
    format!("{}****{}", start, end)
}

pub fn mask_email(raw: &str) -> String {
    match raw.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => mask_tail(raw, 1, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_card_and_drops_secrets() {
        let body = json!({
            "provider": "stripe",
            "amount": 50,
            "cardNumber": "4242 4242 4242 4242",
            "cvc": "123",
            "securityCode": "999",
            "card": { "number": "5555555555554444", "exp": "12/30", "cvv": "321" },
            "otp": "000111",
            "password": "hunter2",
            "securityAnswer": "rex"
        });

        let masked = mask_snapshot(&body);
        let text = masked.to_string();
        assert_eq!(masked["cardNumber"], "****4242");
        assert_eq!(masked["card"]["number"], "****4444");
        assert_eq!(masked["card"]["exp"], "12/30");
        assert!(masked.get("cvc").is_none());
        assert!(masked.get("securityCode").is_none());
        assert!(masked["card"].get("cvv").is_none());
        assert!(!text.contains("4242 4242 4242 4242"));
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("000111"));
        assert_eq!(masked["amount"], 50);
    }

    #[test]
    fn masks_destination_identifiers() {
        assert_eq!(mask_email("jane@example.com"), "j***@example.com");
        assert_eq!(mask_tail("FR7630006000011234567890189", 4, 4), "FR76****0189");
        assert_eq!(mask_tail("771234567", 0, 4), "****4567");
        assert_eq!(mask_tail("123", 2, 2), "***");
    }
}
