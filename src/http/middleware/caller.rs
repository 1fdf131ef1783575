use crate::domain::caller::Caller;
use crate::error::GatewayError;
use crate::repo::callers_repo::CallersRepo;
use anyhow::Result;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::sync::Arc;

pub const AUTH_SUBJECT_HEADER: &str = "x-auth-subject";

#[async_trait::async_trait]
pub trait CallerDirectory: Send + Sync {
    async fn find_by_subject(&self, subject_id: &str) -> Result<Option<Caller>>;
}

#[async_trait::async_trait]
impl CallerDirectory for CallersRepo {
    async fn find_by_subject(&self, subject_id: &str) -> Result<Option<Caller>> {
        CallersRepo::find_by_subject(self, subject_id).await
    }
}

#[derive(Default, Clone)]
pub struct StaticDirectory {
    pub callers: HashMap<String, Caller>,
}

#[async_trait::async_trait]
impl CallerDirectory for StaticDirectory {
    async fn find_by_subject(&self, subject_id: &str) -> Result<Option<Caller>> {
        Ok(self.callers.get(subject_id).cloned())
    }
}

pub async fn resolve_caller(directory: &dyn CallerDirectory, subject: Option<&str>) -> Result<Option<Caller>> {
    match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => directory.find_by_subject(subject).await,
        None => Ok(None),
    }
}

/// Attaches the caller profile as a request extension. A missing or unknown
/// subject leaves it absent and the risk gate answers `unauthenticated`.
pub async fn attach_caller(
    State(directory): State<Arc<dyn CallerDirectory>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let subject = request
        .headers()
        .get(AUTH_SUBJECT_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    match resolve_caller(directory.as_ref(), subject.as_deref()).await {
        Ok(Some(caller)) => {
            request.extensions_mut().insert(caller);
        }
        Ok(None) => {
            if let Some(subject) = subject {
                tracing::debug!(subject = %subject, "no caller profile for subject");
            }
        }
        Err(e) => return GatewayError::System(e.context("caller lookup failed")).into_response(),
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::caller::AccountKind;

    #[tokio::test]
    async fn blank_subject_resolves_to_nobody() {
        let mut directory = StaticDirectory::default();
        directory.callers.insert(
            "u1".to_string(),
            Caller {
                subject_id: "u1".to_string(),
                display_name: None,
                role: "user".to_string(),
                account: AccountKind::Individual { kyc_level: 2 },
                security_questions: vec![],
            },
        );

        assert!(resolve_caller(&directory, Some("  ")).await.unwrap().is_none());
        assert!(resolve_caller(&directory, None).await.unwrap().is_none());
        assert!(resolve_caller(&directory, Some("ghost")).await.unwrap().is_none());
        let found = resolve_caller(&directory, Some(" u1 ")).await.unwrap().unwrap();
        assert_eq!(found.subject_id, "u1");
    }
}
