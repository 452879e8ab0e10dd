//! Role checks on decoded tokens
//!
//! A guard holds a set of realm roles; a request passes if its token carries
//! any one of them.

use tracing::debug;

use super::jwt::DecodedToken;
use crate::types::ApiError;

#[derive(Debug, Clone)]
pub struct RoleGuard {
    required: Vec<String>,
}

impl RoleGuard {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Allow the request if its token shares at least one role with the guard
    pub fn check(&self, token: Option<&DecodedToken>) -> Result<(), ApiError> {
        let Some(token) = token else {
            return Err(ApiError::Unauthorized("Authentication required".into()));
        };

        let granted = token.roles();
        if self.required.iter().any(|role| granted.contains(role)) {
            Ok(())
        } else {
            debug!(required = ?self.required, granted = ?granted, "Role check failed");
            Err(ApiError::Forbidden("Insufficient permissions".into()))
        }
    }
}
