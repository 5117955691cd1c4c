//! Bearer token verification. Handlers receive a verified [`Caller`]; nothing past
//! this module looks at tokens.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use problem::ProblemResponse;
use serde::Deserialize;
use tracing::{debug, error};

use crate::api::rest::ctx::RequestCtx;
use crate::api::rest::error::{INTERNAL, UNAUTHORIZED};
use crate::config::IdentityConfig;
use crate::contract::model::Caller;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Verifies identity-provider tokens (HS256 shared secret or RS256 public key).
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(cfg: &IdentityConfig) -> anyhow::Result<Self> {
        let (key, alg) = match (&cfg.hs256_secret, &cfg.rs256_public_key_pem) {
            (Some(secret), None) if !secret.is_empty() => {
                (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
            }
            (None, Some(pem)) => (
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .context("identity.rs256_public_key_pem is not a valid RSA public key")?,
                Algorithm::RS256,
            ),
            (Some(_), Some(_)) => {
                return Err(anyhow!(
                    "set only one of identity.hs256_secret and identity.rs256_public_key_pem"
                ))
            }
            _ => {
                return Err(anyhow!(
                    "identity.hs256_secret or identity.rs256_public_key_pem must be set"
                ))
            }
        };

        let mut validation = Validation::new(alg);
        match &cfg.issuer {
            Some(iss) => validation.set_issuer(&[iss]),
            None => validation.iss = None,
        }
        match &cfg.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    /// Check signature, expiry and the configured issuer/audience; return the subject.
    pub fn verify(&self, token: &str) -> Result<Caller, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        if data.claims.sub.trim().is_empty() {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
        }
        Ok(Caller::new(data.claims.sub))
    }
}

fn extract_bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = RequestCtx::from_parts(parts);
        let Some(verifier) = parts.extensions.get::<Arc<JwtVerifier>>().cloned() else {
            error!("JwtVerifier extension is not installed on this router");
            return Err(ctx.problem(&INTERNAL, "Authentication is not configured"));
        };
        let Some(token) = extract_bearer(parts) else {
            return Err(ctx.problem(&UNAUTHORIZED, "Missing bearer token"));
        };
        verifier.verify(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ctx.problem(&UNAUTHORIZED, "Invalid or expired token")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        aud: Option<&'a str>,
    }

    fn exp_in(secs: i64) -> u64 {
        (chrono::Utc::now().timestamp() + secs) as u64
    }

    fn token(secret: &str, claims: &TestClaims<'_>) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn hs256(secret: &str) -> IdentityConfig {
        IdentityConfig {
            hs256_secret: Some(secret.into()),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_valid_token_and_returns_subject() {
        let verifier = JwtVerifier::from_config(&hs256("k")).unwrap();
        let t = token(
            "k",
            &TestClaims { sub: "user_1", exp: exp_in(600), iss: None, aud: Some("anything") },
        );
        assert_eq!(verifier.verify(&t).unwrap(), Caller::new("user_1"));
    }

    #[test]
    fn rejects_wrong_signature_and_expired_tokens() {
        let verifier = JwtVerifier::from_config(&hs256("k")).unwrap();
        let forged = token(
            "other",
            &TestClaims { sub: "u", exp: exp_in(600), iss: None, aud: None },
        );
        assert!(verifier.verify(&forged).is_err());

        let expired = token(
            "k",
            &TestClaims { sub: "u", exp: exp_in(-3600), iss: None, aud: None },
        );
        assert!(verifier.verify(&expired).is_err());
        assert!(verifier.verify("not-a-jwt").is_err());
    }

    #[test]
    fn enforces_configured_issuer_and_audience() {
        let verifier = JwtVerifier::from_config(&IdentityConfig {
            issuer: Some("https://idp.test".into()),
            audience: Some("storefront".into()),
            hs256_secret: Some("k".into()),
            rs256_public_key_pem: None,
        })
        .unwrap();

        let good = token(
            "k",
            &TestClaims {
                sub: "u",
                exp: exp_in(600),
                iss: Some("https://idp.test"),
                aud: Some("storefront"),
            },
        );
        assert!(verifier.verify(&good).is_ok());

        let wrong_aud = token(
            "k",
            &TestClaims {
                sub: "u",
                exp: exp_in(600),
                iss: Some("https://idp.test"),
                aud: Some("other"),
            },
        );
        assert!(verifier.verify(&wrong_aud).is_err());
    }

    #[test]
    fn empty_subject_is_rejected() {
        let verifier = JwtVerifier::from_config(&hs256("k")).unwrap();
        let t = token("k", &TestClaims { sub: " ", exp: exp_in(600), iss: None, aud: None });
        assert!(verifier.verify(&t).is_err());
    }

    #[test]
    fn key_source_must_be_configured_exactly_once() {
        assert!(JwtVerifier::from_config(&IdentityConfig::default()).is_err());
        assert!(JwtVerifier::from_config(&IdentityConfig {
            hs256_secret: Some("a".into()),
            rs256_public_key_pem: Some("b".into()),
            ..Default::default()
        })
        .is_err());
        assert!(JwtVerifier::from_config(&IdentityConfig {
            rs256_public_key_pem: Some("garbage".into()),
            ..Default::default()
        })
        .is_err());
    }
}
