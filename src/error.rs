use crate::domain::verdict::Denial;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("denied: {}", .0.reason.code())]
    Denied(Denial),
    #[error("security question required")]
    ChallengeRequired { question: String },
    #[error("{provider} timed out")]
    UpstreamTimeout { provider: String },
    #[error("{provider} answered with an anti-bot challenge")]
    UpstreamChallenge { provider: String },
    #[error("{provider} returned {status}: {message}")]
    UpstreamError {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("{provider} unreachable")]
    UpstreamUnavailable { provider: String },
    #[error("internal error: {0}")]
    System(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::Denied(d) => d.reason.status(),
            GatewayError::ChallengeRequired { .. } => StatusCode::PRECONDITION_REQUIRED,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamChallenge { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::System(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            GatewayError::Validation(msg) => ErrorBody {
                error: msg.clone(),
                code: Some("invalid_request".to_string()),
                details: None,
            },
            GatewayError::Denied(d) => ErrorBody {
                error: d.reason.message().to_string(),
                code: Some(d.reason.code().to_string()),
                details: d.details.clone(),
            },
            GatewayError::ChallengeRequired { question } => ErrorBody {
                error: "Additional verification required, answer the security question".to_string(),
                code: Some("challenge_required".to_string()),
                details: Some(serde_json::json!({ "question": question })),
            },
            GatewayError::UpstreamTimeout { provider } => ErrorBody {
                error: format!("{} did not respond in time, please retry later", provider),
                code: Some("upstream_timeout".to_string()),
                details: None,
            },
            GatewayError::UpstreamChallenge { .. } => ErrorBody {
                error: "The payment provider is temporarily protected, please retry later".to_string(),
                code: Some("upstream_protected".to_string()),
                details: Some(serde_json::Value::String("cloudflare_challenge".to_string())),
            },
            GatewayError::UpstreamError { message, .. } => ErrorBody {
                error: message.clone(),
                code: Some("upstream_error".to_string()),
                details: None,
            },
            GatewayError::UpstreamUnavailable { provider } => ErrorBody {
                error: format!("{} is temporarily unavailable", provider),
                code: Some("upstream_unavailable".to_string()),
                details: None,
            },
            GatewayError::System(_) => ErrorBody {
                error: "Internal error".to_string(),
                code: Some("internal_error".to_string()),
                details: None,
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let GatewayError::System(e) = &self {
            tracing::error!("internal error: {:#}", e);
        }
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::verdict::DenyReason;

    #[test]
    fn system_errors_do_not_leak_internal_text() {
        let err = GatewayError::System(anyhow::anyhow!("connection string postgres://secret"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_string(&err.body()).unwrap();
        assert!(!body.contains("postgres://"));
    }

    #[test]
    fn denial_carries_code_and_details() {
        let err = GatewayError::Denied(Denial::with_details(
            DenyReason::LimitExceeded,
            serde_json::json!({"max": 5000}),
        ));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let body = err.body();
        assert_eq!(body.code.as_deref(), Some("limit_exceeded"));
        assert_eq!(body.details.unwrap()["max"], 5000);
    }

    #[test]
    fn upstream_status_is_propagated() {
        let err = GatewayError::UpstreamError {
            provider: "stripe".to_string(),
            status: 422,
            message: "card declined".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
