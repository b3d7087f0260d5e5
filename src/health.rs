//! Health check report (§6): `GET /health-check`, always unauthenticated
//! regardless of `excludedPaths` (§8 invariant 10).

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::Ordering;

use crate::dispatcher::DispatchState;
use crate::metrics::MetricsSnapshot;

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum RpcStatus {
    #[serde(rename = "ok")]
    Ok { mode: &'static str, details: String },
    #[serde(rename = "error")]
    Error {
        error: String,
        details: String,
        critical: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime: u64,
    pub timestamp: String,
    pub rpc: RpcStatus,
    pub metrics: MetricsSnapshot,
    pub methods: Vec<String>,
    pub auth: &'static str,
}

pub(crate) fn health_report(state: &DispatchState) -> HealthReport {
    let method_names = state.methods.names();
    let is_listening = state.is_listening.load(Ordering::Acquire);
    let has_methods = !method_names.is_empty();

    // §6: has-registered-methods AND is-listening -> server; has-methods
    // AND not-listening -> error; no-methods -> client-only.
    let rpc = if has_methods && is_listening {
        RpcStatus::Ok {
            mode: "server",
            details: format!("listening with {} registered method(s)", method_names.len()),
        }
    } else if has_methods {
        RpcStatus::Error {
            error: "server not listening".to_string(),
            details: "methods are registered but the endpoint has not started".to_string(),
            critical: true,
        }
    } else {
        RpcStatus::Ok {
            mode: "client-only",
            details: "no methods registered; usable as an outbound client".to_string(),
        }
    };

    HealthReport {
        status: "ok",
        uptime: state.metrics.uptime_ms(),
        timestamp: Utc::now().to_rfc3339(),
        rpc,
        metrics: state.metrics.snapshot(&state.circuit_breakers, &state.bulkheads),
        methods: method_names,
        auth: if state.jwt_auth_enabled { "JWT RS256" } else { "disabled" },
    }
}
