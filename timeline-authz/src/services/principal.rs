//! Principal resolution from verified access tokens.
//!
//! Tokens are issued elsewhere; this module only verifies them and maps the
//! claims onto a [`Principal`].

use std::fs;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AuthzError, AuthzResult};
use crate::config::JwtConfig;
use crate::models::Principal;

/// Claims read from an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Super-admin flag granted by the issuer
    #[serde(default)]
    pub super_admin: bool,
}

/// Verifies access tokens and resolves them to principals.
#[derive(Clone)]
pub struct PrincipalResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl PrincipalResolver {
    /// Build a resolver from configuration: an HS256 shared secret or an
    /// RS256 public key file.
    pub fn new(config: &JwtConfig) -> AuthzResult<Self> {
        let (decoding_key, algorithm) = match (&config.secret, &config.public_key_path) {
            (Some(secret), None) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            (None, Some(path)) => {
                let public_key_pem = fs::read_to_string(path).map_err(|e| {
                    AuthzError::Internal(anyhow::anyhow!(
                        "Failed to read public key from {}: {}",
                        path,
                        e
                    ))
                })?;
                let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
                    AuthzError::Internal(anyhow::anyhow!("Failed to parse public key: {}", e))
                })?;
                (key, Algorithm::RS256)
            }
            _ => {
                return Err(AuthzError::Internal(anyhow::anyhow!(
                    "Exactly one of JWT_SECRET or JWT_PUBLIC_KEY_PATH must be set"
                )));
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        tracing::info!(algorithm = ?algorithm, "Principal resolver initialized");

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Resolver that verifies HS256 tokens signed with `secret`.
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Resolve an optional bearer token.
    ///
    /// No token yields the anonymous principal; a token that fails
    /// verification is an error rather than a silent downgrade to anonymous.
    pub fn resolve(&self, bearer: Option<&str>) -> AuthzResult<Principal> {
        let Some(token) = bearer else {
            return Ok(Principal::anonymous());
        };

        let claims = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AuthzError::InvalidToken(e)
            })?
            .claims;

        Self::from_claims(&claims)
    }

    /// Map verified claims onto a principal.
    pub fn from_claims(claims: &AccessTokenClaims) -> AuthzResult<Principal> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            tracing::warn!(sub = %claims.sub, "Access token subject is not a user id");
            AuthzError::NotAuthenticated
        })?;
        Ok(Principal::new(user_id, claims.super_admin))
    }
}

/// Strip a `Bearer ` prefix from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
