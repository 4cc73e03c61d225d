use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{DirectoryError, Result};
use crate::user::User;

pub const DEFAULT_API_URL: &str = "https://randomuser.me/api/";
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// A paginated source of user records.
///
/// An empty page signals that the source is exhausted.
#[async_trait]
pub trait UserSource: Send + Sync + 'static {
    /// Fetches page `page` (1-based) holding at most `results` users.
    async fn fetch_page(&self, page: u32, results: u32) -> Result<Vec<User>>;
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    results: Vec<User>,
}

/// HTTP client for the randomuser.me API (or anything speaking the same shape).
#[derive(Clone, Debug)]
pub struct RandomUserClient {
    http: Client,
    api_url: Url,
}

impl RandomUserClient {
    pub fn new(api_url: &str) -> Result<Self> {
        Ok(Self::with_client(Client::new(), Url::parse(api_url)?))
    }

    pub fn with_client(http: Client, api_url: Url) -> Self {
        Self { http, api_url }
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Builds `{api_url}?results={results}&page={page}`, keeping any query already present.
    pub fn page_url(&self, page: u32, results: u32) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("results", &results.to_string())
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl UserSource for RandomUserClient {
    async fn fetch_page(&self, page: u32, results: u32) -> Result<Vec<User>> {
        let url = self.page_url(page, results);
        debug!(%url, "fetching users page");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, page, "user API returned an error status");
            return Err(DirectoryError::Status { status });
        }

        let body = response.bytes().await?;
        let payload: PageResponse = serde_json::from_slice(&body)?;
        debug!(page, count = payload.results.len(), "decoded users page");
        Ok(payload.results)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;

    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;

    use super::*;

    async fn users(Query(query): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
        let results: u32 = query.get("results").and_then(|r| r.parse().ok()).unwrap_or(0);
        match page {
            1 => {
                let users: Vec<Value> = (0..results)
                    .map(|i| {
                        json!({
                            "name": { "first": format!("First{i}"), "last": "Doe" },
                            "email": format!("user{i}@example.com"),
                            "login": { "uuid": format!("uuid-{i}") }
                        })
                    })
                    .collect();
                (StatusCode::OK, Json(json!({ "results": users, "info": { "page": page } })))
            }
            2 => (StatusCode::OK, Json(json!({ "results": [] }))),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "boom" })),
            ),
        }
    }

    async fn spawn_user_server() -> anyhow::Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new().route("/api/", get(users));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(addr)
    }

    #[test]
    fn page_url_appends_results_then_page() {
        let client = RandomUserClient::new("https://randomuser.me/api/?seed=abc").unwrap();
        assert_eq!(
            client.page_url(3, 5).as_str(),
            "https://randomuser.me/api/?seed=abc&results=5&page=3"
        );
    }

    #[test]
    fn rejects_invalid_api_url() {
        assert!(matches!(
            RandomUserClient::new("not a url"),
            Err(DirectoryError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn fetches_and_decodes_a_page() {
        let addr = spawn_user_server().await.expect("spawn server");
        let client = RandomUserClient::new(&format!("http://{addr}/api/")).unwrap();

        let users = client.fetch_page(1, 3).await.expect("page 1");
        assert_eq!(users.len(), 3);
        assert_eq!(users[2].key(), "uuid-2");
        assert_eq!(users[0].display_name(), "First0 Doe");

        let empty = client.fetch_page(2, 3).await.expect("page 2");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_a_hard_failure() {
        let addr = spawn_user_server().await.expect("spawn server");
        let client = RandomUserClient::new(&format!("http://{addr}/api/")).unwrap();

        let err = client.fetch_page(9, 3).await.unwrap_err();
        match &err {
            DirectoryError::Status { status } => assert_eq!(*status, StatusCode::INTERNAL_SERVER_ERROR),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Failed to fetch users");
    }
}
