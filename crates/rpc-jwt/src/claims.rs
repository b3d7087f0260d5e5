//! The claim set produced by a successful verification.

use serde::Deserialize;

/// Standard claims the verifier itself inspects, plus whatever else the
/// token carries. `extra` holds every claim not named explicitly so
/// callers can read application-specific fields (e.g. `sub`, `roles`)
/// without this crate needing to know about them.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
