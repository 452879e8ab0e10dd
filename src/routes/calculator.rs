//! Calculator routes
//!
//! - POST /api/calculator/{add,subtract,multiply,divide,power,sqrt}
//! - GET  /api/calculator/history?limit=N

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    authorize, error_response, json_response, not_found_response, parse_json_object, parse_limit,
    sub_path, ApiRequest,
};
use crate::calculator::{calculate, Operation};
use crate::server::AppState;
use crate::types::Result;

pub const PREFIX: &str = "/api/calculator";

pub async fn handle_calculator_request(
    state: &Arc<AppState>,
    req: &ApiRequest,
) -> Response<Full<Bytes>> {
    let token = match authorize(state, req, state.calculator_guard.as_ref()).await {
        Ok(token) => token,
        Err(e) => return error_response(e),
    };
    debug!(
        subject = ?token.subject(),
        development = token.is_development(),
        "Calculator request authorized"
    );

    let result = match (&req.method, sub_path(&req.path, PREFIX)) {
        (&Method::GET, "/history") => history(state, req).await,
        (&Method::POST, p) => match p.strip_prefix('/').and_then(Operation::from_path) {
            Some(operation) => run_operation(state, req, operation).await,
            None => return not_found_response(&req.path),
        },
        _ => return not_found_response(&req.path),
    };

    result.unwrap_or_else(error_response)
}

async fn run_operation(
    state: &AppState,
    req: &ApiRequest,
    operation: Operation,
) -> Result<Response<Full<Bytes>>> {
    let body = parse_json_object(&req.body)?;
    let calculation = calculate(&state.history, operation, &body).await?;

    info!(
        id = calculation.id,
        operation = %operation,
        result = calculation.result,
        "Calculation recorded"
    );
    Ok(json_response(StatusCode::OK, &calculation))
}

async fn history(state: &AppState, req: &ApiRequest) -> Result<Response<Full<Bytes>>> {
    let limit = parse_limit(req.query.as_deref())?;
    let entries = state.history.list(limit).await;
    Ok(json_response(StatusCode::OK, &entries))
}
