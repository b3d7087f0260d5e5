//! Configuration for the RS256 verifier.

use jsonwebtoken::DecodingKey;

/// RSA public key plus the optional issuer/audience constraints checked
/// after signature and timing validation.
pub struct VerifierConfig {
    pub(crate) decoding_key: DecodingKey,
    pub(crate) issuer: Option<String>,
    pub(crate) audience: Option<String>,
}

impl VerifierConfig {
    /// Builds a config from a PEM-encoded RSA public key (`-----BEGIN
    /// PUBLIC KEY-----` or `-----BEGIN RSA PUBLIC KEY-----`).
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            decoding_key: DecodingKey::from_rsa_pem(pem)?,
            issuer: None,
            audience: None,
        })
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}
