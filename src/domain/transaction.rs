use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
    Challenged,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Challenged => "challenged",
        }
    }

    pub fn from_provider(label: Option<&str>) -> Self {
        match label.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("succeeded" | "success" | "successful" | "completed" | "paid" | "confirmed") => {
                TransactionStatus::Succeeded
            }
            Some("failed" | "failure" | "declined" | "rejected" | "error") => TransactionStatus::Failed,
            Some("cancelled" | "canceled" | "voided") => TransactionStatus::Cancelled,
            _ => TransactionStatus::Pending,
        }
    }


    pub fn counts_toward_velocity(&self) -> bool {
        !matches!(self, TransactionStatus::Failed | TransactionStatus::Challenged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub provider: String,
    pub amount: Decimal,
    pub currency: String,
    pub destination: Option<String>,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub request_id: String,
    pub error_message: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn matches_reference(record: &TransactionRecord, reference: &str) -> bool {
    record.reference.as_deref() == Some(reference)
        || record.meta.get("reference").and_then(|v| v.as_str()) == Some(reference)
        || record.meta.get("id").and_then(|v| v.as_str()) == Some(reference)
}

/// `meta` is always a JSON object so both ledgers can merge into it.
pub fn meta_object(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(_) => value,
        serde_json::Value::Null => serde_json::json!({}),
        other => serde_json::json!({ "raw": other }),
    }
}

#[cfg(test)]
mod tests {
    use super::{meta_object, TransactionStatus};
    use serde_json::json;

    #[test]
    fn meta_is_always_an_object() {
        assert_eq!(meta_object(json!(null)), json!({}));
        assert_eq!(meta_object(json!("<html>ok</html>")), json!({"raw": "<html>ok</html>"}));
        assert_eq!(meta_object(json!([1, 2])), json!({"raw": [1, 2]}));
        assert_eq!(meta_object(json!({"id": "pi_1"})), json!({"id": "pi_1"}));
    }

    #[test]
    fn provider_labels_map_to_status() {
        assert_eq!(TransactionStatus::from_provider(None), TransactionStatus::Pending);
        assert_eq!(TransactionStatus::from_provider(Some("PAID")), TransactionStatus::Succeeded);
        assert_eq!(TransactionStatus::from_provider(Some("canceled")), TransactionStatus::Cancelled);
        assert_eq!(TransactionStatus::from_provider(Some("processing")), TransactionStatus::Pending);
        assert!(!TransactionStatus::Challenged.counts_toward_velocity());
    }
}
