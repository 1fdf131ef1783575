use serde_json::Value;

#[derive(Debug, Clone)]
pub enum Exchange {
    Reply { status: u16, body: String },
    TimedOut,
    NoResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Accepted {
        status: u16,
        body: Value,
        reference: Option<String>,
        status_label: Option<String>,
    },
    Challenge { status: u16 },
    Rejected {
        status: u16,
        message: String,
        body: Value,
    },
    TimedOut,
    Unavailable,
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Accepted { .. } => "accepted",
            DispatchOutcome::Challenge { .. } => "upstream_challenge",
            DispatchOutcome::Rejected { .. } => "upstream_error",
            DispatchOutcome::TimedOut => "timeout",
            DispatchOutcome::Unavailable => "unavailable",
        }
    }
}

const CHALLENGE_STATUSES: [u16; 3] = [403, 429, 503];

const CHALLENGE_MARKERS: &[&str] = &[
    "<html",
    "<!doctype",
    "cloudflare",
    "cf-chl",
    "captcha",
    "just a moment",
    "attention required",
    "ddos-guard",
];

pub const RATE_LIMIT_MESSAGE: &str = "The payment provider is receiving too many requests, please retry shortly";
pub const GENERIC_PROVIDER_ERROR: &str = "internal provider error";

pub fn classify(exchange: Exchange) -> DispatchOutcome {
    let (status, raw) = match exchange {
        Exchange::TimedOut => return DispatchOutcome::TimedOut,
        Exchange::NoResponse => return DispatchOutcome::Unavailable,
        Exchange::Reply { status, body } => (status, body),
    };

    let parsed = serde_json::from_str::<Value>(&raw).ok();

    if (200..300).contains(&status) {
        let body = parsed.unwrap_or_else(|| {
            if raw.is_empty() {
                Value::Null
            } else {
                Value::String(raw)
            }
        });
        return DispatchOutcome::Accepted {
            status,
            reference: field(&body, &["reference", "id", "transactionId"]),
            status_label: field(&body, &["status"]),
            body,
        };
    }

    if parsed.is_none() && CHALLENGE_STATUSES.contains(&status) && looks_like_challenge(&raw) {
        return DispatchOutcome::Challenge { status };
    }

    let body = parsed.unwrap_or(Value::Null);
    let message = if status == 429 {
        RATE_LIMIT_MESSAGE.to_string()
    } else {
        error_message(&body).unwrap_or_else(|| GENERIC_PROVIDER_ERROR.to_string())
    };
    DispatchOutcome::Rejected { status, message, body }
}

fn looks_like_challenge(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
}

fn field(body: &Value, names: &[&str]) -> Option<String> {
    let scopes = [Some(body), body.get("data")];
    names.iter().find_map(|name| {
        scopes
            .iter()
            .flatten()
            .find_map(|scope| scope.get(*name).and_then(Value::as_str))
            .map(str::to_string)
    })
}

fn error_message(body: &Value) -> Option<String> {
    let text = |v: &Value| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    body.get("message")
        .and_then(text)
        .or_else(|| body.get("error").and_then(text))
        .or_else(|| body.get("error").and_then(|e| e.get("message")).and_then(text))
}
