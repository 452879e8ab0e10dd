//! Authentication and authorization
//!
//! Provides:
//! - Bearer token verification against the identity provider's published keys
//! - A cached, rate-limited JWKS client
//! - Role checks on verified claims

pub mod jwks;
pub mod jwt;
pub mod roles;

pub use crate::config::AuthMode;
pub use jwks::{JwksClient, JwksConfig, KeyProvider};
pub use jwt::{extract_token_from_header, AuthError, Claims, DecodedToken, RealmAccess, TokenValidator};
pub use roles::RoleGuard;
