//! Carnet REST API client.
//!
//! Every request reads the token store right before it is sent and carries
//! `Authorization: Bearer <token>` when a token is present.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::{
    Article, ArticleUpdate, Category, Comment, Identity, LoginRequest, LoginResponse, MeResponse,
    NewArticle, RegisterRequest, UserSummary,
};
use crate::session::IdentityProvider;
use crate::token_store::{redact, TokenStore};

const GENERIC_ERROR: &str = "Erreur";
const LOGIN_ERROR: &str = "Erreur de connexion";
const DELETE_ERROR: &str = "Erreur suppression";

/// HTTP client for the Carnet API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    server_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a new API client reading its bearer token from `tokens`.
    pub fn new(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Self {
            http: builder.build().unwrap_or_default(),
            server_url: config.server_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|e| ClientError::Config(format!("Invalid server URL {}: {}", self.server_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("Server URL cannot be a base: {}", self.server_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build a request and attach the stored token, if any.
    pub async fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "API request");

        let mut request = self.http.request(method, url);
        if let Some(token) = self.tokens.get().await? {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        Ok(request)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, fallback: &str) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::debug!(%status, "API request failed");
            return Err(ClientError::from_response(status, &body, fallback));
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, request: RequestBuilder, fallback: &str) -> Result<(), ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, "API request failed");
            return Err(ClientError::from_response(status, &body, fallback));
        }

        Ok(())
    }

    /// Exchange credentials for a token and identity.
    ///
    /// Does not touch the session; hand the result to
    /// [`SessionManager::login`](crate::SessionManager::login).
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.request(Method::POST, &["auth", "login"]).await?.json(&body);
        self.send_json(request, LOGIN_ERROR).await
    }

    /// Create an account. The server answers with a message only; the user
    /// signs in afterwards.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<(), ClientError> {
        let body = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let request = self.request(Method::POST, &["auth", "register"]).await?.json(&body);
        self.send_empty(request, "Erreur d'inscription").await
    }

    pub async fn list_articles(&self) -> Result<Vec<Article>, ClientError> {
        let request = self.request(Method::GET, &["articles"]).await?;
        self.send_json(request, GENERIC_ERROR).await
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, ClientError> {
        let request = self.request(Method::GET, &["articles", id]).await?;
        self.send_json(request, GENERIC_ERROR).await
    }

    pub async fn create_article(&self, article: &NewArticle) -> Result<(), ClientError> {
        let request = self.request(Method::POST, &["articles"]).await?.json(article);
        self.send_empty(request, GENERIC_ERROR).await
    }

    pub async fn update_article(&self, id: &str, article: &ArticleUpdate) -> Result<(), ClientError> {
        let request = self.request(Method::PUT, &["articles", id]).await?.json(article);
        self.send_empty(request, GENERIC_ERROR).await
    }

    pub async fn delete_article(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &["articles", id]).await?;
        self.send_empty(request, DELETE_ERROR).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        let request = self.request(Method::GET, &["categories"]).await?;
        self.send_json(request, GENERIC_ERROR).await
    }

    pub async fn list_comments(&self, article_id: &str) -> Result<Vec<Comment>, ClientError> {
        let request = self.request(Method::GET, &["comments", article_id]).await?;
        self.send_json(request, GENERIC_ERROR).await
    }

    pub async fn add_comment(&self, article_id: &str, content: &str) -> Result<(), ClientError> {
        let request = self
            .request(Method::POST, &["comments", article_id])
            .await?
            .json(&serde_json::json!({ "content": content }));
        self.send_empty(request, GENERIC_ERROR).await
    }

    /// Admin only on the server side.
    pub async fn list_users(&self) -> Result<Vec<UserSummary>, ClientError> {
        let request = self.request(Method::GET, &["users"]).await?;
        self.send_json(request, GENERIC_ERROR).await
    }

    /// Admin only on the server side.
    pub async fn delete_user(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &["users", id]).await?;
        self.send_empty(request, DELETE_ERROR).await
    }
}

#[async_trait]
impl IdentityProvider for ApiClient {
    /// `GET /me` authenticated with `token` rather than the stored one.
    async fn fetch_identity(&self, token: &str) -> Result<Identity, ClientError> {
        tracing::debug!(token = %redact(token), "Fetching current identity");
        let request = self
            .http
            .get(self.endpoint(&["me"])?)
            .header(AUTHORIZATION, format!("Bearer {}", token));
        let me: MeResponse = self.send_json(request, GENERIC_ERROR).await?;
        Ok(me.user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        self.login(email, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;

    fn client_with(store: MemoryTokenStore, server_url: &str) -> ApiClient {
        let config = ClientConfig::default().with_server_url(server_url);
        ApiClient::new(&config, Arc::new(store))
    }

    #[test]
    fn test_client_creation() {
        let client = client_with(MemoryTokenStore::new(), "http://localhost:4000/");
        assert_eq!(client.server_url(), "http://localhost:4000");
    }

    #[test]
    fn test_endpoint_paths() {
        let client = client_with(MemoryTokenStore::new(), "http://localhost:4000");
        let url = client.endpoint(&["comments", "a1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4000/comments/a1");

        let client = client_with(MemoryTokenStore::new(), "https://example.org/api/");
        let url = client.endpoint(&["articles", "a 1"]).unwrap();
        assert_eq!(url.as_str(), "https://example.org/api/articles/a%201");
    }

    #[test]
    fn test_invalid_server_url() {
        let client = client_with(MemoryTokenStore::new(), "not a url");
        assert!(matches!(client.endpoint(&["me"]), Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_request_attaches_stored_token() {
        let client = client_with(MemoryTokenStore::with_token("tok-1"), "http://localhost:4000");

        let request = client.request(Method::GET, &["articles"]).await.unwrap().build().unwrap();
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer tok-1");
        assert_eq!(request.url().path(), "/articles");
    }

    #[tokio::test]
    async fn test_request_without_token() {
        let client = client_with(MemoryTokenStore::new(), "http://localhost:4000");

        let request = client.request(Method::DELETE, &["users", "u1"]).await.unwrap().build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert_eq!(request.method(), Method::DELETE);
    }

    #[tokio::test]
    async fn test_request_follows_store_changes() {
        let store = Arc::new(MemoryTokenStore::new());
        let config = ClientConfig::default();
        let client = ApiClient::new(&config, store.clone());

        store.set("late-token").await.unwrap();
        let request = client.request(Method::GET, &["users"]).await.unwrap().build().unwrap();
        assert_eq!(request.headers().get(AUTHORIZATION).unwrap(), "Bearer late-token");

        store.clear().await.unwrap();
        let request = client.request(Method::GET, &["users"]).await.unwrap().build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = client_with(MemoryTokenStore::new(), "http://127.0.0.1:9");
        let result = client.fetch_identity("tok").await;
        assert!(matches!(result, Err(ClientError::Network(_))));
    }
}
