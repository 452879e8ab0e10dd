//! Logging setup and request logging
//!
//! `RUST_LOG` takes precedence over the configured level. Bearer tokens are
//! never written out in full.

use hyper::header::AUTHORIZATION;
use hyper::{HeaderMap, Method, Uri};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::jwt::token_preview;

/// Install the global subscriber
pub fn init(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("windsurf_backend={},info", log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Header list safe to log, with the Authorization value shortened
pub fn redacted_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().unwrap_or("<binary>");
            if *name == AUTHORIZATION {
                format!("{}: {}", name, redact_authorization(value))
            } else {
                format!("{}: {}", name, value)
            }
        })
        .collect()
}

fn redact_authorization(value: &str) -> String {
    match value.strip_prefix("Bearer ") {
        Some(token) => format!("Bearer {}", token_preview(token)),
        None => "<redacted>".to_string(),
    }
}

/// Log an inbound request
pub fn log_inbound(request_id: &str, method: &Method, uri: &Uri, headers: &HeaderMap) {
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        headers = ?redacted_headers(headers),
        "Inbound request"
    );
}
