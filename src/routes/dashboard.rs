//! Dashboard routes
//!
//! - GET /api/dashboard             (stats, recent activity, charts)
//! - GET /api/dashboard/stats
//! - GET /api/dashboard/activity?limit=N

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    authorize, error_response, json_response, message_response, not_found_response, parse_limit,
    sub_path, ApiRequest,
};
use crate::dashboard::service::DASHBOARD_ACTIVITY_LIMIT;
use crate::server::AppState;

pub const PREFIX: &str = "/api/dashboard";

pub async fn handle_dashboard_request(
    state: &Arc<AppState>,
    req: &ApiRequest,
) -> Response<Full<Bytes>> {
    let token = match authorize(state, req, state.dashboard_guard.as_ref()).await {
        Ok(token) => token,
        Err(e) => return error_response(e),
    };
    debug!(
        subject = ?token.subject(),
        development = token.is_development(),
        "Dashboard request authorized"
    );

    match (&req.method, sub_path(&req.path, PREFIX)) {
        (&Method::GET, "") => match state.dashboard.dashboard().await {
            Ok(data) => json_response(StatusCode::OK, &data),
            Err(e) => {
                error!(error = %e, "Error fetching dashboard data");
                message_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch dashboard data",
                )
            }
        },
        (&Method::GET, "/stats") => json_response(StatusCode::OK, &state.dashboard.stats().await),
        (&Method::GET, "/activity") => match parse_limit(req.query.as_deref()) {
            Ok(limit) => {
                let limit = limit.unwrap_or(DASHBOARD_ACTIVITY_LIMIT);
                json_response(StatusCode::OK, &state.dashboard.activity(limit).await)
            }
            Err(e) => error_response(e),
        },
        _ => not_found_response(&req.path),
    }
}
