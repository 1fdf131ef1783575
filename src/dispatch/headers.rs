use crate::domain::payment::RequestMeta;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use uuid::Uuid;

pub struct OutboundHeaders {
    pub request_id: String,
    pub map: HeaderMap,
}

/// Audit headers sent with every provider call. The inbound correlation id is
/// propagated when present, otherwise a fresh one is minted.
pub fn outbound(meta: &RequestMeta, user_id: &str, internal_token: &str) -> OutboundHeaders {
    let request_id = meta
        .correlation_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut map = HeaderMap::new();
    map.insert(ACCEPT, HeaderValue::from_static("application/json"));
    put(&mut map, "x-internal-token", internal_token);
    put(&mut map, "x-request-id", &request_id);
    put(&mut map, "x-user-id", user_id);
    put(
        &mut map,
        "x-session-id",
        meta.session_id.as_deref().unwrap_or(&request_id),
    );

    if let Some(auth) = meta.authorization.as_deref().filter(|a| !is_null_credential(a)) {
        if let Ok(v) = HeaderValue::from_str(auth) {
            map.insert(AUTHORIZATION, v);
        }
    }
    if let Some(device) = &meta.device_id {
        put(&mut map, "x-device-id", device);
    }

    OutboundHeaders { request_id, map }
}

// Front-ends send the literal string "null" when no token exists.
fn is_null_credential(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    v.is_empty() || v == "null" || v == "bearer null" || v == "bearer"
}

fn put(map: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            map.insert(HeaderName::from_static(name), v);
        }
        Err(_) => tracing::warn!(header = name, "dropping header with invalid characters"),
    }
}
