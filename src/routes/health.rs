//! Service index and liveness endpoints
//!
//! Neither requires authentication.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::json_response;
use crate::server::AppState;

#[derive(Serialize)]
pub struct ServiceEntry {
    pub name: &'static str,
    pub endpoint: &'static str,
}

/// Response for `GET /`
#[derive(Serialize)]
pub struct ServiceIndex {
    pub message: &'static str,
    pub services: Vec<ServiceEntry>,
}

/// Response for `GET /health`
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always true while the process is serving
    pub healthy: bool,
    pub version: &'static str,
    /// Authentication mode ("enforce" or "bypass")
    pub mode: String,
    pub timestamp: String,
}

pub fn service_index() -> Response<Full<Bytes>> {
    let index = ServiceIndex {
        message: "Windsurf Backend API",
        services: vec![
            ServiceEntry {
                name: "Dashboard Service",
                endpoint: "/api/dashboard",
            },
            ServiceEntry {
                name: "Calculator Service",
                endpoint: "/api/calculator",
            },
        ],
    };

    json_response(StatusCode::OK, &index)
}

pub fn health_check(state: &AppState) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        mode: state.validator.mode().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };

    json_response(StatusCode::OK, &response)
}
