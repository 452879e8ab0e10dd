//! Third-party data API client
//!
//! The API exposes `GET /user`, `GET /post` and `GET /comment`, each taking a
//! `limit` query parameter and an `app-id` header, and answering with
//! `{ "data": [...], "total": N }`.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// One page of records
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub register_date: Option<DateTime<Utc>>,
}

/// Author of a post or comment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub owner: Owner,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub owner: Owner,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first, last)
}

impl User {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

impl Owner {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

/// Errors from the data API
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Source of users, posts and comments (allows mocking in tests)
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn users(&self, limit: usize) -> Result<Page<User>, UpstreamError>;

    async fn posts(&self, limit: usize) -> Result<Page<Post>, UpstreamError>;

    async fn comments(&self, limit: usize) -> Result<Page<Comment>, UpstreamError>;
}

/// HTTP client for the data API
pub struct DataApiClient {
    base_url: String,
    app_id: String,
    http_client: reqwest::Client,
}

impl DataApiClient {
    pub fn new(base_url: impl Into<String>, app_id: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("windsurf-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            http_client,
        }
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        resource: &str,
        limit: usize,
    ) -> Result<Page<T>, UpstreamError> {
        let url = format!("{}/{}", self.base_url, resource);
        debug!(url = %url, limit, "Fetching from data API");

        let response = self
            .http_client
            .get(&url)
            .header("app-id", &self.app_id)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        response
            .json::<Page<T>>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl DataSource for DataApiClient {
    async fn users(&self, limit: usize) -> Result<Page<User>, UpstreamError> {
        self.get_page("user", limit).await
    }

    async fn posts(&self, limit: usize) -> Result<Page<Post>, UpstreamError> {
        self.get_page("post", limit).await
    }

    async fn comments(&self, limit: usize) -> Result<Page<Comment>, UpstreamError> {
        self.get_page("comment", limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> DataApiClient {
        DataApiClient::new(
            format!("{}/data/v1/", server.uri()),
            "test-app",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_users_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/v1/user"))
            .and(query_param("limit", "1"))
            .and(header("app-id", "test-app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "u1", "title": "mr", "firstName": "Ada", "lastName": "Lovelace" }
                ],
                "total": 99,
                "page": 0,
                "limit": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).users(1).await.unwrap();
        assert_eq!(page.total, Some(99));
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].full_name(), "Ada Lovelace");
        assert!(page.data[0].register_date.is_none());
    }

    #[tokio::test]
    async fn test_posts_with_dates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/v1/post"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "p1",
                    "text": "hello",
                    "publishDate": "2020-05-24T14:53:17.598Z",
                    "owner": { "id": "u1", "firstName": "Sara", "lastName": "Andersen" }
                }],
                "total": 1
            })))
            .mount(&server)
            .await;

        let page = client(&server).posts(5).await.unwrap();
        let post = &page.data[0];
        assert_eq!(post.owner.full_name(), "Sara Andersen");
        assert_eq!(
            post.publish_date.unwrap().to_rfc3339(),
            "2020-05-24T14:53:17.598+00:00"
        );
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "APP_ID_MISSING" })))
            .mount(&server)
            .await;

        let err = client(&server).comments(3).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).users(1).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }
}
