use crate::error::ErrorBody;
use crate::http::middleware::caller::AUTH_SUBJECT_HEADER;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct RateLimitState {
    pub redis_client: redis::Client,
    pub max_per_minute: i64,
}

pub fn bucket_key(headers: &HeaderMap, minute: &str) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let who = match header(AUTH_SUBJECT_HEADER) {
        Some(subject) => format!("caller:{}", subject),
        None => {
            let ip = header("x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .unwrap_or("unknown");
            format!("ip:{}", ip)
        }
    };
    format!("rate:{}:{}", who, minute)
}

// Fails open when Redis is unreachable.
pub async fn enforce(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let minute = chrono::Utc::now().format("%Y%m%d%H%M").to_string();
    let key = bucket_key(request.headers(), &minute);

    match state.redis_client.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            let count: i64 = conn.incr(&key, 1).await.unwrap_or(1);
            let _: bool = conn.expire(&key, 120).await.unwrap_or(false);
            if count > state.max_per_minute {
                tracing::warn!(bucket = %key, count, "rate limit exceeded");
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorBody {
                        error: "Too many requests, please retry in a minute".to_string(),
                        code: Some("rate_limited".to_string()),
                        details: Some(serde_json::json!({ "max": state.max_per_minute })),
                    }),
                )
                    .into_response();
            }
        }
        Err(e) => tracing::warn!("rate limiter unavailable: {}", e),
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn subject_wins_over_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        assert_eq!(bucket_key(&headers, "202601010000"), "rate:ip:10.0.0.1:202601010000");

        headers.insert(AUTH_SUBJECT_HEADER, HeaderValue::from_static("u1"));
        assert_eq!(bucket_key(&headers, "202601010000"), "rate:caller:u1:202601010000");
    }
}
