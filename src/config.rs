//! Configuration for the backend
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// How the token validator treats requests without a valid bearer token.
///
/// Chosen once at startup and handed to the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum AuthMode {
    /// Reject missing or invalid tokens with 401
    #[default]
    Enforce,
    /// Let such requests through carrying a development placeholder
    Bypass,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Enforce => write!(f, "enforce"),
            AuthMode::Bypass => write!(f, "bypass"),
        }
    }
}

/// Windsurf backend - calculator and dashboard API
#[derive(Parser, Debug, Clone)]
#[command(name = "windsurf-backend")]
#[command(about = "Calculator and dashboard API behind bearer-token authentication")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3001")]
    pub listen: SocketAddr,

    /// Authentication mode (enforce rejects bad tokens, bypass lets them through)
    #[arg(long, env = "AUTH_MODE", value_enum, default_value_t = AuthMode::Enforce)]
    pub auth_mode: AuthMode,

    /// Token issuer (identity provider realm URL)
    #[arg(
        long,
        env = "OIDC_ISSUER",
        default_value = "http://0.0.0.0:8080/realms/windsurf"
    )]
    pub oidc_issuer: String,

    /// Explicit JWKS endpoint override.
    /// Defaults to the issuer's openid-connect certs endpoint.
    #[arg(long, env = "JWKS_URI")]
    pub jwks_uri: Option<String>,

    /// Expected token audience (only checked when set)
    #[arg(long, env = "JWT_AUDIENCE")]
    pub jwt_audience: Option<String>,

    /// Maximum key-set fetches per minute against the identity provider
    #[arg(long, env = "JWKS_REQUESTS_PER_MINUTE", default_value = "5")]
    pub jwks_requests_per_minute: u32,

    /// How long fetched signing keys stay cached, in seconds
    #[arg(long, env = "JWKS_CACHE_TTL_SECS", default_value = "600")]
    pub jwks_cache_ttl_secs: u64,

    /// Base URL of the third-party data API
    #[arg(long, env = "DATA_API_URL", default_value = "https://dummyapi.io/data/v1")]
    pub data_api_url: String,

    /// Credential sent as the `app-id` header to the data API
    #[arg(long, env = "DUMMYAPI_KEY", default_value = "64f2e5c7d2b9f9e9c7d3d3e3")]
    pub data_api_key: String,

    /// Timeout for every outbound HTTP call, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Comma-separated realm roles allowed to use the calculator (any one suffices)
    #[arg(long, env = "CALCULATOR_ROLES")]
    pub calculator_roles: Option<String>,

    /// Comma-separated realm roles allowed to use the dashboard (any one suffices)
    #[arg(long, env = "DASHBOARD_ROLES")]
    pub dashboard_roles: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Effective JWKS endpoint (falls back to the issuer's certs endpoint)
    pub fn jwks_uri(&self) -> String {
        match &self.jwks_uri {
            Some(uri) => uri.clone(),
            None => format!(
                "{}/protocol/openid-connect/certs",
                self.oidc_issuer.trim_end_matches('/')
            ),
        }
    }

    /// Outbound request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Signing-key cache lifetime
    pub fn jwks_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_cache_ttl_secs)
    }

    /// Roles required for the calculator routes, if any
    pub fn calculator_role_list(&self) -> Option<Vec<String>> {
        self.calculator_roles.as_deref().map(split_roles)
    }

    /// Roles required for the dashboard routes, if any
    pub fn dashboard_role_list(&self) -> Option<Vec<String>> {
        self.dashboard_roles.as_deref().map(split_roles)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.jwks_requests_per_minute == 0 {
            return Err("JWKS_REQUESTS_PER_MINUTE must be greater than zero".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        for (name, url) in [
            ("OIDC_ISSUER", self.oidc_issuer.as_str()),
            ("DATA_API_URL", self.data_api_url.as_str()),
        ] {
            if !is_http_url(url) {
                return Err(format!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }

        if let Some(ref uri) = self.jwks_uri {
            if !is_http_url(uri) {
                return Err(format!("JWKS_URI must be an http(s) URL, got '{}'", uri));
            }
        }

        for (name, roles) in [
            ("CALCULATOR_ROLES", self.calculator_role_list()),
            ("DASHBOARD_ROLES", self.dashboard_role_list()),
        ] {
            if let Some(roles) = roles {
                if roles.is_empty() {
                    return Err(format!("{} must name at least one role", name));
                }
            }
        }

        Ok(())
    }
}

fn split_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
