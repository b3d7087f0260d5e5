//! Outbound client (component G, §4.6): the composed pipeline a caller
//! drives to invoke a method on a peer endpoint — gate, retry, timeout,
//! transport, in that order.

use crate::config::RetrySettings;
use crate::error::ApiError;
use crate::metrics::MetricsAggregator;
use rpc_resilience_circuitbreaker::CircuitBreakerRegistry;
use rpc_resilience_retry::{ExponentialBackoff, RetryConfig, RetryExecutor};
use rpc_resilience_timelimiter::TimeLimiter;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Per-call overrides layered over the endpoint's configured retry
/// defaults (§4.6 step 2: `defaults ← retryOptions ← top-level options`).
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub token: Option<String>,
    pub retry: Option<RetrySettings>,
    pub connection_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
}

/// Drives outbound RPC calls through the circuit breaker, retry, and
/// timeout stack before hitting the wire.
pub struct OutboundClient {
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    metrics: Arc<MetricsAggregator>,
    default_retry: RetrySettings,
    default_connection_timeout: Duration,
    default_request_timeout: Duration,
}

impl OutboundClient {
    pub fn new(
        circuit_breakers: Arc<CircuitBreakerRegistry>,
        metrics: Arc<MetricsAggregator>,
        default_retry: RetrySettings,
        default_connection_timeout: Duration,
        default_request_timeout: Duration,
    ) -> Self {
        Self {
            circuit_breakers,
            metrics,
            default_retry,
            default_connection_timeout,
            default_request_timeout,
        }
    }

    /// Invokes `methodName` on `serviceUrl` with JSON `params`, per §4.6.
    pub async fn call(
        &self,
        service_url: &str,
        method_name: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<Value, ApiError> {
        let base =
            Url::parse(service_url).map_err(|e| ApiError::BadRequest(format!("invalid serviceUrl: {e}")))?;
        if method_name.is_empty() {
            return Err(ApiError::BadRequest("methodName must not be empty".to_string()));
        }
        if !params.is_object() {
            return Err(ApiError::BadRequest("params must be a JSON object".to_string()));
        }
        let url = base
            .join(&format!("/{method_name}"))
            .map_err(|e| ApiError::BadRequest(format!("invalid methodName: {e}")))?;

        let retry_settings = options.retry.clone().unwrap_or_else(|| self.default_retry.clone());
        let connection_timeout = options.connection_timeout.unwrap_or(self.default_connection_timeout);
        let request_timeout = options.request_timeout.unwrap_or(self.default_request_timeout);
        let token = options.token.clone();

        // Step 3: gate through the circuit breaker before a single byte
        // of the retry loop runs.
        self.circuit_breakers.gate(service_url)?;

        let retry_executor = build_retry_executor(&retry_settings, Arc::clone(&self.metrics));
        let outcome = retry_executor
            .execute(|_attempt| {
                let url = url.clone();
                let params = params.clone();
                let token = token.clone();
                async move {
                    send_one_attempt(&url, &params, token.as_deref(), connection_timeout, request_timeout).await
                }
            })
            .await;

        match &outcome {
            Ok(_) => self.circuit_breakers.record_success(service_url),
            Err(ApiError::CircuitOpen { .. }) => {}
            Err(_) => self.circuit_breakers.record_failure(service_url),
        }

        if let Err(ApiError::Timeout) = &outcome {
            self.metrics.record_timeout();
        }

        outcome
    }
}

/// One HTTP/2 attempt: open a session bounded by `connection_timeout`,
/// send bounded by `request_timeout` (§4.6 step 4).
async fn send_one_attempt(
    url: &Url,
    params: &Value,
    token: Option<&str>,
    connection_timeout: Duration,
    request_timeout: Duration,
) -> Result<Value, ApiError> {
    // A session is opened per attempt (§9 open question, permissive
    // choice): building a fresh client lets `connect_timeout` bound just
    // the connection phase independently of the overall request timeout.
    let http = reqwest::Client::builder()
        .http2_prior_knowledge()
        .connect_timeout(connection_timeout)
        .build()
        .map_err(|e| ApiError::Internal(format!("failed to build HTTP/2 client: {e}")))?;

    let limiter = TimeLimiter::new("outbound-request");
    let send = async {
        let mut request = http.post(url.clone()).json(params);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        if status.as_u16() >= 400 {
            if let Some(code) = body.get("error").and_then(|v| v.as_str()) {
                let message = body
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("request failed")
                    .to_string();
                return Err(peer_error(code, message, status.as_u16(), &body));
            }
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }

        match body.get("data") {
            Some(data) => Ok(data.clone()),
            None => Ok(body),
        }
    };

    limiter.call(request_timeout, send).await.map_err(|e| match e {
        rpc_resilience_timelimiter::TimeLimiterError::Timeout => ApiError::Timeout,
        rpc_resilience_timelimiter::TimeLimiterError::Inner(inner) => inner,
    })
}

/// Maps a peer's error envelope back to the taxonomy, reading the
/// envelope's structured `method`/`availableMethods` fields where the
/// variant carries them, and falling back to the HTTP status bucket for
/// codes this side doesn't recognize.
fn peer_error(code: &str, message: String, status: u16, body: &Value) -> ApiError {
    match code {
        "UNAUTHORIZED" => ApiError::Unauthorized(message),
        "FORBIDDEN" => ApiError::Forbidden(message),
        "BAD_REQUEST" => ApiError::BadRequest(message),
        "INVALID_JSON" => ApiError::InvalidJson(message),
        "METHOD_NOT_FOUND" => ApiError::MethodNotFound {
            method: body
                .get("method")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            available: body
                .get("availableMethods")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|m| m.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
        },
        "PAYLOAD_TOO_LARGE" => ApiError::PayloadTooLarge,
        "METHOD_BULKHEAD_EXCEEDED" => ApiError::MethodBulkheadExceeded {
            method: String::new(),
            reason: message,
        },
        _ => ApiError::Http { status },
    }
}

fn build_retry_executor(settings: &RetrySettings, metrics: Arc<MetricsAggregator>) -> RetryExecutor<ApiError> {
    let retry_on = settings.retry_on.clone();
    let config = RetryConfig::builder()
        .max_retries(settings.max_retries)
        .backoff(
            ExponentialBackoff::new(
                Duration::from_millis(settings.initial_delay_ms),
                settings.backoff_factor,
                Duration::from_millis(settings.max_delay_ms),
            )
            .jitter(settings.jitter_enabled),
        )
        .retry_on(move |err: &ApiError| should_retry(err, &retry_on))
        .on_retry(move |_attempt, _delay| metrics.record_retry())
        .build();
    RetryExecutor::new(config)
}

/// Classifies a failed attempt per §4.5: hard client-protocol codes never
/// retry; otherwise HTTP statuses in `retryOn`, timeouts, and anything
/// that never reached a peer (connection/parse failures) are retryable.
fn should_retry(err: &ApiError, retry_on: &[u16]) -> bool {
    if err.is_client_protocol() {
        return false;
    }
    match err {
        ApiError::Http { status } => retry_on.contains(status),
        ApiError::Timeout => true,
        ApiError::CircuitOpen { .. } => false,
        ApiError::Internal(_) => false,
        ApiError::MethodBulkheadExceeded { .. } => true,
        ApiError::Parse(_) => true,
        ApiError::Transport { .. } => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_protocol_errors_never_retry() {
        assert!(!should_retry(&ApiError::Unauthorized("x".into()), &[500]));
        assert!(!should_retry(
            &ApiError::MethodNotFound {
                method: "x".into(),
                available: vec![]
            },
            &[500]
        ));
    }

    #[test]
    fn http_status_retries_only_when_listed() {
        assert!(should_retry(&ApiError::Http { status: 503 }, &[500, 503]));
        assert!(!should_retry(&ApiError::Http { status: 404 }, &[500, 503]));
    }

    #[test]
    fn timeouts_always_retry() {
        assert!(should_retry(&ApiError::Timeout, &[]));
    }
}
