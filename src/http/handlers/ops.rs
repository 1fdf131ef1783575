use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub ledger: bool,
    pub rate_limiter: bool,
}

impl Readiness {
    pub fn new(ledger: bool, rate_limiter: bool) -> Self {
        Self {
            ready: ledger && rate_limiter,
            ledger,
            rate_limiter,
        }
    }

    pub fn status(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn ledger_reachable(pool: &sqlx::PgPool) -> bool {
    matches!(
        tokio::time::timeout(CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await,
        Ok(Ok(_))
    )
}

async fn rate_limiter_reachable(client: &redis::Client) -> bool {
    let ping = async {
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await
    };
    matches!(tokio::time::timeout(CHECK_TIMEOUT, ping).await, Ok(Ok(_)))
}

pub async fn readiness(State(state): State<AppState>) -> Response {
    let (ledger, rate_limiter) = tokio::join!(
        ledger_reachable(&state.pool),
        rate_limiter_reachable(&state.redis_client)
    );
    let report = Readiness::new(ledger, rate_limiter);
    if !report.ready {
        tracing::warn!(ledger, rate_limiter, "not ready");
    }
    (report.status(), Json(report)).into_response()
}

pub async fn liveness() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "alive": true }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_only_when_both_dependencies_answer() {
        assert_eq!(Readiness::new(true, true).status(), StatusCode::OK);
        assert_eq!(Readiness::new(true, false).status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = serde_json::to_value(Readiness::new(false, true)).unwrap();
        assert_eq!(body, serde_json::json!({"ready": false, "ledger": false, "rate_limiter": true}));
    }
}
