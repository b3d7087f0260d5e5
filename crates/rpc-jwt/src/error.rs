//! Verification failure reasons (§4.2).
//!
//! Each variant corresponds to one short-circuiting step of the
//! verification contract, in the order checks run.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The token is not three non-empty base64url segments joined by dots.
    Format,
    /// The header's `alg` is not `RS256`.
    Algorithm,
    /// The signature does not verify against the configured public key.
    Signature,
    /// `exp` is in the past.
    Expired,
    /// `nbf` is in the future.
    NotYetValid,
    /// `iss` does not match the configured issuer.
    IssuerMismatch,
    /// `aud` does not match the configured audience.
    AudienceMismatch,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Format => "format",
            InvalidReason::Algorithm => "algorithm",
            InvalidReason::Signature => "signature",
            InvalidReason::Expired => "expired",
            InvalidReason::NotYetValid => "not_before",
            InvalidReason::IssuerMismatch => "issuer_mismatch",
            InvalidReason::AudienceMismatch => "audience_mismatch",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
