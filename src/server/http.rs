//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each request body is
//! collected up front and handed to [`routes::dispatch`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{JwksClient, JwksConfig, RoleGuard, TokenValidator};
use crate::calculator::HistoryLedger;
use crate::config::{Args, AuthMode};
use crate::dashboard::{DashboardService, DataApiClient};
use crate::logging;
use crate::routes::{self, bad_request_response, ApiRequest};
use crate::types::ApiError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Bearer token validation for every /api route
    pub validator: TokenValidator,
    /// Calculations made during this process lifetime
    pub history: HistoryLedger,
    pub dashboard: Arc<DashboardService>,
    /// Role requirement for /api/calculator, when configured
    pub calculator_guard: Option<RoleGuard>,
    /// Role requirement for /api/dashboard, when configured
    pub dashboard_guard: Option<RoleGuard>,
}

impl AppState {
    /// Build state with the production identity provider and data API clients
    pub fn new(args: Args) -> Self {
        let jwks = JwksClient::new(JwksConfig {
            jwks_uri: args.jwks_uri(),
            cache_ttl: args.jwks_cache_ttl(),
            requests_per_minute: args.jwks_requests_per_minute,
            request_timeout: args.request_timeout(),
        });
        let validator = TokenValidator::new(
            args.auth_mode,
            Arc::new(jwks),
            &args.oidc_issuer,
            args.jwt_audience.as_deref(),
        );

        let source = DataApiClient::new(
            args.data_api_url.clone(),
            args.data_api_key.clone(),
            args.request_timeout(),
        );
        let dashboard = Arc::new(DashboardService::new(Arc::new(source)));

        Self::with_services(args, validator, dashboard)
    }

    /// Build state around already constructed services
    pub fn with_services(
        args: Args,
        validator: TokenValidator,
        dashboard: Arc<DashboardService>,
    ) -> Self {
        let calculator_guard = args.calculator_role_list().map(RoleGuard::new);
        let dashboard_guard = args.dashboard_role_list().map(RoleGuard::new);

        Self {
            args,
            validator,
            history: HistoryLedger::new(),
            dashboard,
            calculator_guard,
            dashboard_guard,
        }
    }
}

/// Run the HTTP server until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), ApiError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Windsurf backend listening on {}", state.args.listen);

    if state.validator.mode() == AuthMode::Bypass {
        warn!("Auth bypass enabled - requests without a valid token are let through");
    }
    if let Some(ref guard) = state.calculator_guard {
        info!(roles = ?guard.required(), "Calculator routes require one of the roles");
    }
    if let Some(ref guard) = state.dashboard_guard {
        info!(roles = ?guard.required(), "Dashboard routes require one of the roles");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Collect the request and route it
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let request_id = Uuid::new_v4().to_string();
    logging::log_inbound(&request_id, req.method(), req.uri(), req.headers());
    debug!(request_id = %request_id, peer = %addr, "Accepted request");

    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(request_id = %request_id, "Request body error: {}", e);
            return Ok(to_boxed(bad_request_response("Failed to read request body")));
        }
    };

    let api_request = ApiRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };

    let mut response = routes::dispatch(&state, api_request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("X-Request-Id", value);
    }

    Ok(to_boxed(response))
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}
