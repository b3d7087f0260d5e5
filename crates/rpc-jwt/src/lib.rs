//! RS256 bearer token verification for the `rpc-endpoint` inbound
//! dispatcher.
//!
//! Verification never touches `authFailures` — that counter belongs to
//! the caller, which knows whether the request path even required auth.

mod claims;
mod config;
mod error;
mod verifier;

pub use claims::Claims;
pub use config::VerifierConfig;
pub use error::InvalidReason;
pub use verifier::Verifier;
