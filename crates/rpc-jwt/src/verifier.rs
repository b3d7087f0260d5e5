//! Manual step-by-step RS256 verification (§4.2), so each failure mode
//! gets its own reason instead of `jsonwebtoken`'s single collapsed error.

use crate::claims::Claims;
use crate::config::VerifierConfig;
use crate::error::InvalidReason;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::Algorithm;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, serde::Deserialize)]
struct Header {
    alg: String,
}

/// Verifies a bearer token per the §4.2 contract, short-circuiting on the
/// first failed step.
pub struct Verifier {
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, InvalidReason> {
        let (header_b64, payload_b64, signature_b64, signed_message) =
            split_segments(token).ok_or(InvalidReason::Format)?;

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| InvalidReason::Format)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| InvalidReason::Format)?;
        if header.alg != "RS256" {
            return Err(InvalidReason::Algorithm);
        }

        let verified = jsonwebtoken::crypto::verify(
            signature_b64,
            signed_message.as_bytes(),
            &self.config.decoding_key,
            Algorithm::RS256,
        )
        .unwrap_or(false);
        if !verified {
            return Err(InvalidReason::Signature);
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| InvalidReason::Format)?;
        let claims: Claims =
            serde_json::from_slice(&payload_bytes).map_err(|_| InvalidReason::Format)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs() as i64;

        if let Some(exp) = claims.exp {
            if now >= exp {
                return Err(InvalidReason::Expired);
            }
        }
        if let Some(nbf) = claims.nbf {
            if now < nbf {
                return Err(InvalidReason::NotYetValid);
            }
        }
        if let Some(expected) = &self.config.issuer {
            if claims.iss.as_deref() != Some(expected.as_str()) {
                return Err(InvalidReason::IssuerMismatch);
            }
        }
        if let Some(expected) = &self.config.audience {
            if claims.aud.as_deref() != Some(expected.as_str()) {
                return Err(InvalidReason::AudienceMismatch);
            }
        }

        Ok(claims)
    }
}

/// Splits `header.payload.signature` into its three decoded-ready parts
/// plus the `header.payload` slice the signature was computed over.
/// Returns `None` if the token is not exactly three non-empty segments.
fn split_segments(token: &str) -> Option<(&str, &str, &str, &str)> {
    let mut parts = token.split('.');
    let header = parts.next()?;
    let payload = parts.next()?;
    let signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return None;
    }
    let signed_len = header.len() + 1 + payload.len();
    Some((header, payload, signature, &token[..signed_len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header as JwtHeader};
    use serde::Serialize;

    const TEST_PRIVATE_KEY: &str = include_str!("../testdata/test_key.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../testdata/test_pub.pem");

    #[derive(Serialize)]
    struct TestClaims {
        sub: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exp: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        nbf: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        aud: Option<String>,
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn sign(claims: &TestClaims) -> String {
        let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
        encode(&JwtHeader::new(Algorithm::RS256), claims, &key).unwrap()
    }

    fn verifier() -> Verifier {
        Verifier::new(VerifierConfig::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap())
    }

    #[test]
    fn accepts_a_well_formed_token() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() + 3600),
            nbf: None,
            iss: None,
            aud: None,
        });
        let claims = verifier().verify(&token).unwrap();
        assert_eq!(claims.extra.get("sub").unwrap(), "alice");
    }

    #[test]
    fn accepts_a_token_with_no_exp_claim() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: None,
            nbf: None,
            iss: None,
            aud: None,
        });
        let claims = verifier().verify(&token).unwrap();
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn rejects_malformed_token_format() {
        let err = verifier().verify("not-a-jwt").unwrap_err();
        assert_eq!(err, InvalidReason::Format);
    }

    #[test]
    fn rejects_tampered_signature() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() + 3600),
            nbf: None,
            iss: None,
            aud: None,
        });
        let mut tampered = token.clone();
        tampered.push('x');
        let err = verifier().verify(&tampered).unwrap_err();
        assert_eq!(err, InvalidReason::Signature);
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() - 10),
            nbf: None,
            iss: None,
            aud: None,
        });
        let err = verifier().verify(&token).unwrap_err();
        assert_eq!(err, InvalidReason::Expired);
    }

    #[test]
    fn rejects_not_yet_valid_token() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() + 3600),
            nbf: Some(now() + 60),
            iss: None,
            aud: None,
        });
        let err = verifier().verify(&token).unwrap_err();
        assert_eq!(err, InvalidReason::NotYetValid);
    }

    #[test]
    fn rejects_issuer_mismatch_when_configured() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() + 3600),
            nbf: None,
            iss: Some("wrong-issuer".into()),
            aud: None,
        });
        let v = Verifier::new(
            VerifierConfig::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes())
                .unwrap()
                .issuer("expected-issuer"),
        );
        let err = v.verify(&token).unwrap_err();
        assert_eq!(err, InvalidReason::IssuerMismatch);
    }

    #[test]
    fn rejects_audience_mismatch_when_configured() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() + 3600),
            nbf: None,
            iss: None,
            aud: Some("wrong-audience".into()),
        });
        let v = Verifier::new(
            VerifierConfig::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes())
                .unwrap()
                .audience("expected-audience"),
        );
        let err = v.verify(&token).unwrap_err();
        assert_eq!(err, InvalidReason::AudienceMismatch);
    }

    #[test]
    fn accepts_matching_issuer_and_audience() {
        let token = sign(&TestClaims {
            sub: "alice".into(),
            exp: Some(now() + 3600),
            nbf: None,
            iss: Some("expected-issuer".into()),
            aud: Some("expected-audience".into()),
        });
        let v = Verifier::new(
            VerifierConfig::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes())
                .unwrap()
                .issuer("expected-issuer")
                .audience("expected-audience"),
        );
        assert!(v.verify(&token).is_ok());
    }
}
