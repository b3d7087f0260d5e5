//! Endpoint configuration and eager validation (§4.1).
//!
//! Handlers themselves are registered through [`crate::Endpoint::method`]
//! rather than this struct — everything else the constructor option
//! mapping recognizes lives here, deserializable via `serde` so an
//! embedding application can load it from its own config file.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;

/// A classified configuration error (§4.1: "every option is validated
/// eagerly; invalid shapes fail with a classified configuration error").
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("port must be in 1..65535, got {0}")]
    InvalidPort(u32),
    #[error("jwtAuth is enabled but jwtPublicKey was not supplied")]
    MissingJwtPublicKey,
    #[error("jwtPublicKey is not a valid RSA PEM public key")]
    InvalidJwtPublicKey,
    #[error("resilience.retry.backoffFactor must be > 0, got {0}")]
    InvalidBackoffFactor(f64),
    #[error("resilience.retry.initialDelay must not exceed maxDelay")]
    InitialDelayExceedsMaxDelay,
    #[error("bulkhead maxConcurrent and maxQueue must be > 0 for method '{0}'")]
    InvalidBulkheadLimits(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsOptions {
    pub origin: String,
    pub methods: String,
    pub headers: String,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            methods: "GET,POST,OPTIONS".to_string(),
            headers: "Content-Type,Authorization".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub enabled: bool,
    pub request_timeout_ms: u64,
    pub connection_timeout_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_ms: 30_000,
            connection_timeout_ms: 5_000,
        }
    }
}

impl TimeoutSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub recovery_timeout_ms: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            success_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    /// HTTP statuses treated as retryable, per the permissive
    /// interpretation of §9's open question (both statuses and network
    /// error codes are accepted).
    pub retry_on: Vec<u16>,
    pub jitter_enabled: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            backoff_factor: 2.0,
            retry_on: vec![500, 502, 503, 504],
            jitter_enabled: true,
        }
    }
}

/// Legacy alias for `resilience.retry`, merged in with higher precedence
/// when both are supplied (§4.1: "Legacy alias merged into
/// `resilience.retry` with higher precedence").
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub backoff_factor: Option<f64>,
    pub retry_on: Option<Vec<u16>>,
    pub jitter_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub timeout: TimeoutSettings,
    pub circuit_breaker: CircuitBreakerSettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MethodBulkheadSettings {
    pub max_concurrent: usize,
    pub max_queue: usize,
    pub queue_timeout_ms: u64,
}

impl Default for MethodBulkheadSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_queue: 20,
            queue_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub port: u32,
    pub host: String,
    pub start_server: bool,
    pub cors: bool,
    pub cors_options: CorsOptions,
    pub jwt_auth: bool,
    pub jwt_public_key: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub excluded_paths: HashSet<String>,
    pub resilience: ResilienceSettings,
    pub retry_options: Option<RetryOptions>,
    /// Per-method bulkhead overrides; methods not listed get the default
    /// limits (maxConcurrent 10, maxQueue 20, queueTimeout 10000ms).
    pub method_bulkheads: HashMap<String, MethodBulkheadSettings>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        let mut excluded_paths = HashSet::new();
        excluded_paths.insert("health-check".to_string());
        Self {
            port: 3000,
            host: "localhost".to_string(),
            start_server: false,
            cors: false,
            cors_options: CorsOptions::default(),
            jwt_auth: false,
            jwt_public_key: None,
            jwt_issuer: None,
            jwt_audience: None,
            excluded_paths,
            resilience: ResilienceSettings::default(),
            retry_options: None,
            method_bulkheads: HashMap::new(),
        }
    }
}

impl EndpointConfig {
    pub fn builder() -> EndpointConfigBuilder {
        EndpointConfigBuilder::default()
    }

    /// Effective retry settings after merging the legacy `retryOptions`
    /// alias over `resilience.retry` (§4.1, §4.6 step 2).
    pub fn effective_retry(&self) -> RetrySettings {
        let mut retry = self.resilience.retry.clone();
        if let Some(legacy) = &self.retry_options {
            if let Some(v) = legacy.max_retries {
                retry.max_retries = v;
            }
            if let Some(v) = legacy.initial_delay_ms {
                retry.initial_delay_ms = v;
            }
            if let Some(v) = legacy.max_delay_ms {
                retry.max_delay_ms = v;
            }
            if let Some(v) = legacy.backoff_factor {
                retry.backoff_factor = v;
            }
            if let Some(v) = legacy.retry_on.clone() {
                retry.retry_on = v;
            }
            if let Some(v) = legacy.jitter_enabled {
                retry.jitter_enabled = v;
            }
        }
        retry
    }

    /// Eagerly validates every recognized option, per §4.1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 || self.port > 65535 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        if self.jwt_auth {
            match &self.jwt_public_key {
                None => return Err(ConfigError::MissingJwtPublicKey),
                Some(pem) => {
                    if jsonwebtoken::DecodingKey::from_rsa_pem(pem.as_bytes()).is_err() {
                        return Err(ConfigError::InvalidJwtPublicKey);
                    }
                }
            }
        }
        let retry = self.effective_retry();
        if retry.backoff_factor <= 0.0 {
            return Err(ConfigError::InvalidBackoffFactor(retry.backoff_factor));
        }
        if retry.initial_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::InitialDelayExceedsMaxDelay);
        }
        for (name, bh) in &self.method_bulkheads {
            if bh.max_concurrent == 0 {
                return Err(ConfigError::InvalidBulkheadLimits(name.clone()));
            }
        }
        Ok(())
    }
}

/// Builder mirroring every pattern crate's `*ConfigBuilder` convention.
#[derive(Default)]
pub struct EndpointConfigBuilder {
    inner: EndpointConfig,
}

impl EndpointConfigBuilder {
    pub fn port(mut self, port: u32) -> Self {
        self.inner.port = port;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.inner.host = host.into();
        self
    }

    pub fn start_server(mut self, start: bool) -> Self {
        self.inner.start_server = start;
        self
    }

    pub fn cors(mut self, options: CorsOptions) -> Self {
        self.inner.cors = true;
        self.inner.cors_options = options;
        self
    }

    pub fn jwt_auth(mut self, public_key_pem: impl Into<String>) -> Self {
        self.inner.jwt_auth = true;
        self.inner.jwt_public_key = Some(public_key_pem.into());
        self
    }

    pub fn jwt_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.inner.jwt_issuer = Some(issuer.into());
        self
    }

    pub fn jwt_audience(mut self, audience: impl Into<String>) -> Self {
        self.inner.jwt_audience = Some(audience.into());
        self
    }

    pub fn excluded_path(mut self, method: impl Into<String>) -> Self {
        self.inner.excluded_paths.insert(method.into());
        self
    }

    pub fn resilience(mut self, resilience: ResilienceSettings) -> Self {
        self.inner.resilience = resilience;
        self
    }

    pub fn retry_options(mut self, options: RetryOptions) -> Self {
        self.inner.retry_options = Some(options);
        self
    }

    pub fn method_bulkhead(mut self, method: impl Into<String>, settings: MethodBulkheadSettings) -> Self {
        self.inner.method_bulkheads.insert(method.into(), settings);
        self
    }

    pub fn build(self) -> Result<EndpointConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_contract() {
        let config = EndpointConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "localhost");
        assert!(config.excluded_paths.contains("health-check"));
        assert_eq!(config.resilience.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.resilience.circuit_breaker.recovery_timeout_ms, 60_000);
        assert_eq!(config.resilience.circuit_breaker.success_threshold, 3);
        assert_eq!(config.resilience.retry.max_retries, 3);
        assert_eq!(config.resilience.retry.initial_delay_ms, 500);
        assert_eq!(config.resilience.retry.max_delay_ms, 10_000);
        assert_eq!(config.resilience.retry.retry_on, vec![500, 502, 503, 504]);
        assert!(config.resilience.retry.jitter_enabled);
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = EndpointConfig::builder().port(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(0)));
    }

    #[test]
    fn rejects_jwt_auth_without_public_key() {
        let mut config = EndpointConfig::default();
        config.jwt_auth = true;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::MissingJwtPublicKey
        ));
    }

    #[test]
    fn legacy_retry_options_take_precedence() {
        let mut config = EndpointConfig::default();
        config.retry_options = Some(RetryOptions {
            max_retries: Some(9),
            ..Default::default()
        });
        let effective = config.effective_retry();
        assert_eq!(effective.max_retries, 9);
        assert_eq!(effective.initial_delay_ms, 500); // untouched fields fall through
    }

    #[test]
    fn rejects_initial_delay_exceeding_max_delay() {
        let mut config = EndpointConfig::default();
        config.resilience.retry.initial_delay_ms = 20_000;
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::InitialDelayExceedsMaxDelay
        ));
    }
}
