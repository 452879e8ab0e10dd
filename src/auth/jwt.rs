//! Bearer token validation
//!
//! Tokens are RS256 JWTs issued by the identity provider. The signing key is
//! looked up by the token's `kid` through a [`KeyProvider`], then signature,
//! issuer and expiry are checked.
//!
//! Security notes:
//! - Only RS256 is accepted; tokens declaring any other algorithm fail
//! - In `AuthMode::Bypass`, missing *and* invalid tokens are let through with a
//!   development placeholder. Never run bypass against real traffic.

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::jwks::KeyProvider;
use crate::config::AuthMode;
use crate::types::ApiError;

/// Message for requests without a usable Authorization header
pub const MISSING_TOKEN_MESSAGE: &str = "Access token is missing or invalid";
/// Message for tokens that fail verification
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid access token";

/// Realm-level role assignments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Payload of a verified access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (realm URL)
    pub iss: String,
    /// Subject (user id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub realm_access: RealmAccess,
    /// Any other claims the provider includes
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevelopmentMarker {
    development_mode: bool,
}

/// What the validator attaches to a request
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DecodedToken {
    /// Claims from a verified token
    Verified(Box<Claims>),
    /// Placeholder used when bypass mode let the request through
    Development(DevelopmentMarker),
}

impl DecodedToken {
    pub fn development() -> Self {
        DecodedToken::Development(DevelopmentMarker {
            development_mode: true,
        })
    }

    pub fn is_development(&self) -> bool {
        matches!(self, DecodedToken::Development(_))
    }

    /// Realm roles carried by the token (none for the placeholder)
    pub fn roles(&self) -> &[String] {
        match self {
            DecodedToken::Verified(claims) => &claims.realm_access.roles,
            DecodedToken::Development(_) => &[],
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match self {
            DecodedToken::Verified(claims) => claims.sub.as_deref(),
            DecodedToken::Development(_) => None,
        }
    }
}

/// Why a presented token was rejected
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token header has no key id")]
    MissingKeyId,

    #[error("No signing key with id '{0}'")]
    UnknownKey(String),

    #[error("Key set fetch rate limit reached")]
    RateLimited,

    #[error("Failed to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("Token verification failed: {0}")]
    Verification(String),
}

/// Validates bearer tokens and applies the configured [`AuthMode`]
pub struct TokenValidator {
    mode: AuthMode,
    keys: Arc<dyn KeyProvider>,
    validation: Validation,
}

impl TokenValidator {
    /// Create a validator for tokens from `issuer`.
    ///
    /// Audience is only checked when one is given.
    pub fn new(
        mode: AuthMode,
        keys: Arc<dyn KeyProvider>,
        issuer: &str,
        audience: Option<&str>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            mode,
            keys,
            validation,
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Verify a raw token and return its claims
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::Verification(format!(
                "Unsupported algorithm {:?}",
                header.alg
            )));
        }

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let key = self.keys.signing_key(&kid).await?;

        let data = decode::<Claims>(token, &key, &self.validation).map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired".to_string(),
                ErrorKind::InvalidIssuer => "Invalid issuer".to_string(),
                ErrorKind::InvalidAudience => "Invalid audience".to_string(),
                ErrorKind::InvalidSignature => "Invalid signature".to_string(),
                _ => err.to_string(),
            };
            AuthError::Verification(reason)
        })?;

        Ok(data.claims)
    }

    /// Authenticate a request from its Authorization header value
    pub async fn authenticate(&self, auth_header: Option<&str>) -> Result<DecodedToken, ApiError> {
        let Some(token) = extract_token_from_header(auth_header) else {
            warn!("No valid Authorization header found");
            return match self.mode {
                AuthMode::Bypass => {
                    warn!("Auth bypass: allowing request without valid token");
                    Ok(DecodedToken::development())
                }
                AuthMode::Enforce => Err(ApiError::Unauthorized(MISSING_TOKEN_MESSAGE.into())),
            };
        };

        debug!(token = %token_preview(token), "Token received");

        match self.verify(token).await {
            Ok(claims) => {
                info!(subject = ?claims.sub, "Token verified");
                Ok(DecodedToken::Verified(Box::new(claims)))
            }
            Err(e) => {
                error!(error = %e, "Token verification failed");
                match self.mode {
                    AuthMode::Bypass => {
                        warn!("Auth bypass: allowing request with invalid token");
                        Ok(DecodedToken::development())
                    }
                    AuthMode::Enforce => Err(ApiError::Unauthorized(INVALID_TOKEN_MESSAGE.into())),
                }
            }
        }
    }
}

/// Extract token from an Authorization header.
/// Only the "Bearer <token>" form is accepted.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let token = auth_header?.strip_prefix("Bearer ")?;
    token.split_whitespace().next()
}

/// First characters of a token, safe to log
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    format!("{}...", head)
}
