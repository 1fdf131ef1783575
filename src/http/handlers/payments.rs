use crate::dispatch::ProviderReply;
use crate::domain::caller::Caller;
use crate::domain::payment::RequestMeta;
use crate::error::GatewayError;
use crate::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

type Body = Result<Json<serde_json::Value>, JsonRejection>;

pub async fn initiate(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let meta = RequestMeta::from_headers(&headers);
    let result = match body {
        Ok(Json(raw)) => {
            state
                .payment_service
                .initiate(raw, caller.as_deref(), &meta)
                .await
        }
        Err(rejection) => Err(GatewayError::Validation(rejection.body_text())),
    };
    respond(result)
}

pub async fn confirm(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let meta = RequestMeta::from_headers(&headers);
    let result = match body {
        Ok(Json(raw)) => state.payment_service.confirm(raw, caller.as_deref(), &meta).await,
        Err(rejection) => Err(GatewayError::Validation(rejection.body_text())),
    };
    respond(result)
}

pub async fn cancel(
    State(state): State<AppState>,
    caller: Option<Extension<Caller>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let meta = RequestMeta::from_headers(&headers);
    let result = match body {
        Ok(Json(raw)) => state.payment_service.cancel(raw, caller.as_deref(), &meta).await,
        Err(rejection) => Err(GatewayError::Validation(rejection.body_text())),
    };
    respond(result)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn respond(result: Result<ProviderReply, GatewayError>) -> Response {
    match result {
        Ok(reply) => (
            StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK),
            Json(reply.body),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
