//! The error taxonomy (§6, §7): every failure path the endpoint can hit,
//! collapsed to a stable envelope code and HTTP status. Pattern-crate
//! errors (`CircuitOpenError`, `BulkheadRejectedError`, `InvalidReason`)
//! are adapted into this type at the point they cross into `rpc-endpoint`
//! — nothing downstream of that boundary sees a pattern-crate error type.

use rpc_resilience_bulkhead::BulkheadRejectedError;
use rpc_resilience_circuitbreaker::CircuitOpenError;
use rpc_resilience_timelimiter::TimeLimiterError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("invalid json: {0}")]
    InvalidJson(String),

    #[error("method not found: {method}")]
    MethodNotFound {
        method: String,
        available: Vec<String>,
    },

    #[error("method bulkhead exceeded for '{method}': {reason}")]
    MethodBulkheadExceeded { method: String, reason: String },

    #[error("internal error: {0}")]
    Internal(String),

    /// Client-side only: the outbound circuit breaker rejected the call
    /// without performing I/O.
    #[error("circuit open for target '{target}'")]
    CircuitOpen { target: String },

    #[error("request timed out")]
    Timeout,

    /// A peer responded with an HTTP status ≥ 400 that carried no
    /// recognizable envelope.
    #[error("peer returned HTTP {status}")]
    Http { status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    /// A request never reached a peer at all — connection refused,
    /// connection reset, DNS failure. Carries a code but no HTTP status
    /// (§7b), unlike `Http`.
    #[error("transport error: {code}")]
    Transport { code: String },
}

impl ApiError {
    /// The stable, user-visible envelope code (§6).
    pub fn code(&self) -> String {
        match self {
            ApiError::Unauthorized(_) => "UNAUTHORIZED".to_string(),
            ApiError::Forbidden(_) => "FORBIDDEN".to_string(),
            ApiError::BadRequest(_) => "BAD_REQUEST".to_string(),
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE".to_string(),
            ApiError::InvalidJson(_) => "INVALID_JSON".to_string(),
            ApiError::MethodNotFound { .. } => "METHOD_NOT_FOUND".to_string(),
            ApiError::MethodBulkheadExceeded { .. } => "METHOD_BULKHEAD_EXCEEDED".to_string(),
            ApiError::Internal(_) => "INTERNAL_ERROR".to_string(),
            ApiError::CircuitOpen { .. } => "CIRCUIT_OPEN".to_string(),
            ApiError::Timeout => "TIMEOUT".to_string(),
            ApiError::Http { status } => format!("HTTP_{status}"),
            ApiError::Parse(_) => "PARSE_ERROR".to_string(),
            ApiError::Transport { code } => code.clone(),
        }
    }

    /// HTTP status mapping (§6). Client-only errors (`CIRCUIT_OPEN`,
    /// `TIMEOUT`, transport `Http`) never originate from the inbound
    /// dispatcher, so their status here only matters if an embedder
    /// chooses to surface them over HTTP too.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::BadRequest(_) => 400,
            ApiError::PayloadTooLarge => 413,
            ApiError::InvalidJson(_) => 400,
            ApiError::MethodNotFound { .. } => 404,
            ApiError::MethodBulkheadExceeded { .. } => 503,
            ApiError::Internal(_) => 500,
            ApiError::CircuitOpen { .. } => 503,
            ApiError::Timeout => 504,
            ApiError::Http { status } => *status,
            ApiError::Parse(_) => 400,
            ApiError::Transport { .. } => 502,
        }
    }

    /// Whether this failure belongs to the client-protocol class (§7a):
    /// never retried, surfaced immediately.
    pub fn is_client_protocol(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized(_)
                | ApiError::Forbidden(_)
                | ApiError::BadRequest(_)
                | ApiError::InvalidJson(_)
                | ApiError::MethodNotFound { .. }
                | ApiError::PayloadTooLarge
        )
    }

    /// Builds the JSON error envelope shape from §3 / §4.7.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let mut extra = serde_json::Map::new();
        let (method, available_methods) = match self {
            ApiError::MethodNotFound { method, available } => {
                (Some(method.clone()), Some(available.clone()))
            }
            _ => (None, None),
        };
        if let ApiError::Internal(details) = self {
            extra.insert("details".to_string(), serde_json::Value::String(details.clone()));
        }
        ErrorEnvelope {
            error: self.code(),
            message: self.to_string(),
            method,
            available_methods,
            extra,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(rename = "method", skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(rename = "availableMethods", skip_serializing_if = "Option::is_none")]
    pub available_methods: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl From<CircuitOpenError> for ApiError {
    fn from(err: CircuitOpenError) -> Self {
        ApiError::CircuitOpen { target: err.target }
    }
}

impl From<BulkheadRejectedError> for ApiError {
    fn from(err: BulkheadRejectedError) -> Self {
        ApiError::MethodBulkheadExceeded {
            method: err.method,
            reason: err.reason.as_str().to_string(),
        }
    }
}

impl From<rpc_jwt::InvalidReason> for ApiError {
    fn from(reason: rpc_jwt::InvalidReason) -> Self {
        ApiError::Unauthorized(reason.as_str().to_string())
    }
}

impl<E> From<TimeLimiterError<E>> for ApiError
where
    E: Into<ApiError>,
{
    fn from(err: TimeLimiterError<E>) -> Self {
        match err {
            TimeLimiterError::Timeout => ApiError::Timeout,
            TimeLimiterError::Inner(inner) => inner.into(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
            }
        } else if err.is_connect() {
            ApiError::Transport {
                code: "CONNECT_ERROR".to_string(),
            }
        } else if err.is_request() || err.is_body() {
            // The request never reached a peer (reset mid-flight, no
            // response at all) — a transport failure, not a malformed
            // request on our end.
            ApiError::Transport {
                code: "TRANSPORT_ERROR".to_string(),
            }
        } else {
            ApiError::BadRequest(err.to_string())
        }
    }
}
