//! HTTP routes
//!
//! Requests arrive here fully collected as an [`ApiRequest`], so every route
//! can be exercised without a socket.

pub mod calculator;
pub mod dashboard;
pub mod health;

pub use calculator::handle_calculator_request;
pub use dashboard::handle_dashboard_request;
pub use health::{health_check, service_index};

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::AUTHORIZATION;
use hyper::{HeaderMap, Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::auth::{DecodedToken, RoleGuard};
use crate::server::AppState;
use crate::types::ApiError;

/// A collected inbound request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiRequest {
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}

/// Route a request to its handler
pub async fn dispatch(state: &Arc<AppState>, req: ApiRequest) -> Response<Full<Bytes>> {
    let path = req.path.clone();

    match (&req.method, path.as_str()) {
        // CORS preflight
        (&Method::OPTIONS, _) => preflight_response(),

        (&Method::GET, "/") => service_index(),
        (&Method::GET, "/health") => health_check(state),

        (_, p) if in_group(p, calculator::PREFIX) => handle_calculator_request(state, &req).await,
        (_, p) if in_group(p, dashboard::PREFIX) => handle_dashboard_request(state, &req).await,

        _ => not_found_response(&path),
    }
}

fn in_group(path: &str, prefix: &str) -> bool {
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

/// Path below a route group's prefix, without a trailing slash
pub(crate) fn sub_path<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path).trim_end_matches('/')
}

/// Authenticate the request and apply the group's role guard, if any
pub async fn authorize(
    state: &AppState,
    req: &ApiRequest,
    guard: Option<&RoleGuard>,
) -> Result<DecodedToken, ApiError> {
    let token = state.validator.authenticate(req.authorization()).await?;

    if let Some(guard) = guard {
        guard.check(Some(&token))?;
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<String>,
}

/// Parse the optional `limit` query parameter.
///
/// An empty value counts as absent; anything but a non-negative integer is
/// rejected.
pub fn parse_limit(query: Option<&str>) -> Result<Option<usize>, ApiError> {
    let params: LimitQuery = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e)))?;

    match params.limit.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<usize>().map(Some).map_err(|_| {
            ApiError::BadRequest("\"limit\" must be a non-negative integer".to_string())
        }),
    }
}

/// Parse a JSON request body.
///
/// Empty or non-object bodies yield an empty map; malformed JSON is rejected.
pub fn parse_json_object(body: &Bytes) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn with_cors(builder: hyper::http::response::Builder) -> hyper::http::response::Builder {
    builder
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Expose-Headers", "Authorization")
}

/// JSON response with CORS headers
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_cors(Response::builder())
            .status(status)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(bytes)))
            .unwrap(),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            error_response(ApiError::Internal(e.to_string()))
        }
    }
}

/// `{"error": message}` with the given status
pub fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Render an error, logging it at a level matching its severity
pub fn error_response(err: ApiError) -> Response<Full<Bytes>> {
    match &err {
        ApiError::Internal(_) => error!(error = %err, "Request failed"),
        ApiError::Unauthorized(_) | ApiError::Forbidden(_) => warn!(error = %err, "Request rejected"),
        _ => debug!(error = %err, "Request rejected"),
    }

    let (status, body) = err.into_status_code_and_body();
    json_response(status, &body)
}

/// CORS preflight response
pub fn preflight_response() -> Response<Full<Bytes>> {
    with_cors(Response::builder())
        .status(StatusCode::NO_CONTENT)
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        )
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization, Accept, Cache-Control",
        )
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path,
        }),
    )
}

/// Bad request response
pub fn bad_request_response(message: &str) -> Response<Full<Bytes>> {
    message_response(StatusCode::BAD_REQUEST, message)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::jwt::tests::{valid_token, validator};
    use crate::config::{Args, AuthMode};
    use crate::dashboard::service::tests::FakeSource;
    use crate::dashboard::DashboardService;
    use clap::Parser;
    use http_body_util::BodyExt;
    use hyper::header::HeaderValue;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    pub(crate) fn test_state_with(
        mode: AuthMode,
        source: FakeSource,
        configure: impl FnOnce(&mut Args),
    ) -> Arc<AppState> {
        let mut args = Args::try_parse_from(["windsurf-backend"]).unwrap();
        args.auth_mode = mode;
        configure(&mut args);

        let dashboard = Arc::new(DashboardService::with_rng(
            Arc::new(source),
            StdRng::seed_from_u64(9),
        ));
        Arc::new(AppState::with_services(args, validator(mode), dashboard))
    }

    pub(crate) fn test_state(mode: AuthMode) -> Arc<AppState> {
        test_state_with(mode, FakeSource::sample(), |_| {})
    }

    pub(crate) fn request(
        method: Method,
        target: &str,
        token: Option<&str>,
        body: &str,
    ) -> ApiRequest {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };

        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            );
        }

        ApiRequest {
            method,
            path,
            query,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    pub(crate) async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some("limit=3")).unwrap(), Some(3));
        assert_eq!(parse_limit(Some("foo=bar&limit=0")).unwrap(), Some(0));
        assert_eq!(parse_limit(Some("limit=")).unwrap(), None);
        assert!(matches!(parse_limit(Some("limit=-1")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_limit(Some("limit=ten")), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_limit(Some("limit=2.5")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_parse_json_object() {
        assert!(parse_json_object(&Bytes::new()).unwrap().is_empty());
        assert!(parse_json_object(&Bytes::from_static(b"  \n")).unwrap().is_empty());
        assert!(parse_json_object(&Bytes::from_static(b"[1,2]")).unwrap().is_empty());
        assert!(parse_json_object(&Bytes::from_static(b"null")).unwrap().is_empty());

        let map = parse_json_object(&Bytes::from_static(br#"{"a": 1}"#)).unwrap();
        assert_eq!(map["a"], 1);

        let err = parse_json_object(&Bytes::from_static(b"{not json")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_sub_path() {
        assert_eq!(sub_path("/api/dashboard", "/api/dashboard"), "");
        assert_eq!(sub_path("/api/dashboard/", "/api/dashboard"), "");
        assert_eq!(sub_path("/api/dashboard/stats/", "/api/dashboard"), "/stats");
        assert!(in_group("/api/calculator/add", "/api/calculator"));
        assert!(!in_group("/api/calculatorx", "/api/calculator"));
    }

    #[tokio::test]
    async fn test_preflight_and_cors() {
        let state = test_state(AuthMode::Enforce);
        let response = dispatch(&state, request(Method::OPTIONS, "/api/calculator/add", None, "")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert!(headers["Access-Control-Allow-Headers"]
            .to_str()
            .unwrap()
            .contains("Authorization"));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let state = test_state(AuthMode::Enforce);
        let response = dispatch(&state, request(Method::GET, "/nope", None, "")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["path"], "/nope");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token_when_enforced() {
        let state = test_state(AuthMode::Enforce);

        for (method, target) in [
            (Method::POST, "/api/calculator/add"),
            (Method::GET, "/api/calculator/history"),
            (Method::GET, "/api/dashboard/"),
            (Method::GET, "/api/dashboard/stats"),
            (Method::GET, "/api/dashboard/activity"),
        ] {
            let response = dispatch(&state, request(method, target, None, "")).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", target);
            let body = body_json(response).await;
            assert_eq!(body["error"], "Access token is missing or invalid");
        }
    }

    #[tokio::test]
    async fn test_invalid_token_rejected_when_enforced() {
        let state = test_state(AuthMode::Enforce);
        let response = dispatch(
            &state,
            request(Method::GET, "/api/dashboard/stats", Some("not-a-jwt"), ""),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Invalid access token");
    }

    #[tokio::test]
    async fn test_authorize_returns_verified_identity() {
        let state = test_state(AuthMode::Enforce);
        let token = valid_token(&["user"]);
        let req = request(Method::POST, "/api/calculator/add", Some(&token), r#"{"a":1,"b":2}"#);

        let decoded = authorize(&state, &req, state.calculator_guard.as_ref())
            .await
            .unwrap();
        assert!(!decoded.is_development());
        assert_eq!(decoded.subject(), Some("user-1"));
        assert_eq!(decoded.roles(), ["user".to_string()]);
    }

    #[tokio::test]
    async fn test_bypass_attaches_development_placeholder() {
        let state = test_state(AuthMode::Bypass);
        let req = request(Method::GET, "/api/dashboard/stats", None, "");

        let token = authorize(&state, &req, None).await.unwrap();
        assert_eq!(
            serde_json::to_value(&token).unwrap(),
            serde_json::json!({ "developmentMode": true })
        );

        let response = dispatch(&state, req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
