//! Inbound dispatcher (component H, §4.7): the axum router that turns
//! `POST /<methodName>` into a handler invocation plus a JSON envelope.

use axum::body::{to_bytes, Body};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::CorsOptions;
use crate::error::ApiError;
use crate::health::health_report;
use crate::metrics::MetricsAggregator;
use crate::methods::{MethodRegistry, Params};
use rpc_resilience_bulkhead::BulkheadRegistry;
use rpc_resilience_circuitbreaker::CircuitBreakerRegistry;
use rpc_jwt::Verifier;

/// Maximum accepted request body (§6): 1 MiB.
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

#[derive(Clone)]
pub(crate) struct DispatchState {
    pub methods: MethodRegistry,
    pub bulkheads: Arc<BulkheadRegistry>,
    pub circuit_breakers: Arc<CircuitBreakerRegistry>,
    pub metrics: Arc<MetricsAggregator>,
    pub verifier: Option<Arc<Verifier>>,
    pub excluded_paths: Arc<HashSet<String>>,
    pub cors: Option<CorsOptions>,
    pub is_listening: Arc<AtomicBool>,
    pub jwt_auth_enabled: bool,
}

pub(crate) fn router(state: DispatchState) -> axum::Router {
    axum::Router::new()
        .route("/health-check", get(health_check))
        .route("/:method", post(dispatch).options(handle_options))
        .with_state(state)
}

async fn health_check(State(state): State<DispatchState>) -> Response {
    let report = health_report(&state);
    (StatusCode::OK, Json(serde_json::json!({ "data": report }))).into_response()
}

async fn handle_options(State(state): State<DispatchState>) -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_cors_headers(&mut response, state.cors.as_ref());
    response
}

async fn dispatch(
    State(state): State<DispatchState>,
    Path(method): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let start = Instant::now();
    let result = dispatch_inner(&state, &method, headers, body).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let (status, success, body) = match result {
        Ok(data) => (StatusCode::OK, true, serde_json::json!({ "data": data })),
        Err(err) => {
            let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            tracing::warn!(method = %method, code = %err.code(), "request failed");
            (status, false, serde_json::to_value(err.to_envelope()).unwrap_or(Value::Null))
        }
    };

    state.metrics.record_request(success, elapsed_ms);

    let mut response = (status, Json(body)).into_response();
    apply_cors_headers(&mut response, state.cors.as_ref());
    response
}

async fn dispatch_inner(
    state: &DispatchState,
    method: &str,
    headers: HeaderMap,
    body: Body,
) -> Result<Value, ApiError> {
    // §4.7 step 4: auth, unless the method is excluded (health-check
    // always is, per the invariant in §8.10).
    let mut user_claims = None;
    if state.jwt_auth_enabled && !state.excluded_paths.contains(method) {
        let verifier = state
            .verifier
            .as_ref()
            .expect("jwt_auth_enabled implies a configured verifier");
        let token = bearer_token(&headers).ok_or_else(|| {
            state.metrics.record_auth_failure();
            tracing::warn!(method = %method, "auth failed: missing bearer token");
            ApiError::Unauthorized("missing bearer token".to_string())
        })?;
        let claims = verifier.verify(token).map_err(|reason| {
            state.metrics.record_auth_failure();
            tracing::warn!(method = %method, reason = %reason.as_str(), "auth failed: token rejected");
            ApiError::from(reason)
        })?;
        user_claims = Some(serde_json::to_value(&claims.extra).unwrap_or(Value::Null));
    }

    // §4.7 step 5: body accumulation bounded at MAX_REQUEST_SIZE.
    let bytes = to_bytes(body, MAX_REQUEST_SIZE)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;

    let mut params: Params = if bytes.is_empty() {
        Params::new()
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => return Err(ApiError::InvalidJson("body must be a JSON object".to_string())),
        }
    };

    // §4.7 step 6: method lookup.
    let handler = state.methods.get(method).ok_or_else(|| ApiError::MethodNotFound {
        method: method.to_string(),
        available: state.methods.names(),
    })?;

    // §4.7 step 7: inject authenticated claims.
    if let Some(user) = user_claims {
        params.insert("_user".to_string(), user);
    }

    // §4.7 step 8: bulkhead admission.
    let permit = state.bulkheads.admit(method).await.map_err(|err| {
        state.metrics.record_bulkhead_rejection();
        ApiError::from(err)
    })?;

    // §4.7 step 9-10: invoke, releasing the permit on every exit path via
    // its Drop impl regardless of the handler's outcome.
    let outcome = handler
        .call(params)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()));
    drop(permit);

    outcome
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn apply_cors_headers(response: &mut Response, cors: Option<&CorsOptions>) {
    let Some(cors) = cors else { return };
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&cors.origin) {
        headers.insert("Access-Control-Allow-Origin", value);
    }
    if let Ok(value) = HeaderValue::from_str(&cors.methods) {
        headers.insert("Access-Control-Allow-Methods", value);
    }
    if let Ok(value) = HeaderValue::from_str(&cors.headers) {
        headers.insert("Access-Control-Allow-Headers", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use rpc_resilience_circuitbreaker::CircuitBreakerConfig;

    fn test_state() -> DispatchState {
        let methods = MethodRegistry::new();
        methods.register("echo", |params: Params| async move { Ok(Value::Object(params)) });
        let config = EndpointConfig::default();
        DispatchState {
            methods,
            bulkheads: Arc::new(BulkheadRegistry::new()),
            circuit_breakers: Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig::default())),
            metrics: Arc::new(MetricsAggregator::new()),
            verifier: None,
            excluded_paths: Arc::new(config.excluded_paths.clone()),
            cors: None,
            is_listening: Arc::new(AtomicBool::new(false)),
            jwt_auth_enabled: false,
        }
    }

    #[tokio::test]
    async fn echo_round_trips_params() {
        let state = test_state();
        let body = Body::from(r#"{"m":"hi"}"#);
        let result = dispatch_inner(&state, "echo", HeaderMap::new(), body).await.unwrap();
        assert_eq!(result, serde_json::json!({"m": "hi"}));
    }

    #[tokio::test]
    async fn unknown_method_reports_available_methods() {
        let state = test_state();
        let err = dispatch_inner(&state, "ghost", HeaderMap::new(), Body::from("{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MethodNotFound { .. }));
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn empty_body_becomes_empty_params() {
        let state = test_state();
        let result = dispatch_inner(&state, "echo", HeaderMap::new(), Body::empty())
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({}));
    }

    #[tokio::test]
    async fn non_json_body_is_rejected() {
        let state = test_state();
        let err = dispatch_inner(&state, "echo", HeaderMap::new(), Body::from("not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidJson(_)));
    }
}
