//! HTTP client for the profile API.
//!
//! Provides a small client around `reqwest` with bearer auth, JSON
//! helpers that map failures onto [`AppError`], the typed profile endpoints
//! ([`api`]), the signed-URL upload orchestrator ([`upload`]), the shared
//! profile cache ([`store`]) and the single-flight service the CLI uses
//! ([`service`]).

pub mod api;
pub mod service;
pub mod single_flight;
pub mod store;
pub mod upload;

use std::time::Duration;

use portrait_core::{AppError, ClientConfig, ErrorMetadata, LogLevel};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use service::ProfilePictureService;
pub use single_flight::SingleFlight;
pub use store::ProfileStore;
pub use upload::{UploadAttempt, UploadOrchestrator, UploadPhase};

/// Reject a missing or blank bearer token before anything touches the network.
pub fn require_token(token: Option<&str>) -> Result<&str, AppError> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Authentication("No authentication token".to_string()))
}

/// HTTP client for the profile API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    transfer_timeout: Duration,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transfer_timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        Self::new(
            config.base_url(),
            config.request_timeout(),
            config.transfer_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Timeout applied to the raw byte transfer to a signed URL.
    pub fn transfer_timeout(&self) -> Duration {
        self.transfer_timeout
    }

    /// Raw client, for requests that must not carry API auth.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn apply_auth(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(request: RequestBuilder) -> Result<Response, AppError> {
        request
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))
    }

    /// Turn a non-success response into a backend error carrying the body's
    /// `message` when it has one.
    async fn check_status(response: Response, fallback: &str) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::from_backend_response(status.as_u16(), &body, fallback))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read response body: {}", e)))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// GET request, authenticated when a token is given. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        fallback: &str,
    ) -> Result<T, AppError> {
        let request = Self::apply_auth(self.client.get(self.build_url(path)), token);
        let response = Self::check_status(Self::send(request).await?, fallback).await?;
        Self::read_json(response).await
    }

    /// Authenticated POST of a JSON body. Deserializes JSON response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, AppError> {
        let request = self
            .client
            .post(self.build_url(path))
            .bearer_auth(token)
            .json(body);
        let response = Self::check_status(Self::send(request).await?, fallback).await?;
        Self::read_json(response).await
    }

    /// Authenticated DELETE. A success status is enough; the body is not read.
    pub async fn delete(&self, path: &str, token: &str, fallback: &str) -> Result<(), AppError> {
        let request = self.client.delete(self.build_url(path)).bearer_auth(token);
        Self::check_status(Self::send(request).await?, fallback).await?;
        Ok(())
    }
}

/// Emit a failure at the level its metadata asks for.
pub(crate) fn log_failure(err: &AppError, operation: &'static str) {
    let code = err.error_code();
    match err.log_level() {
        LogLevel::Debug => tracing::debug!(operation, error_code = code, error = %err, "Operation failed"),
        LogLevel::Warn => tracing::warn!(operation, error_code = code, error = %err, "Operation failed"),
        LogLevel::Error => tracing::error!(operation, error_code = code, error = %err, "Operation failed"),
    }
}

// Re-export the wire types callers need alongside the client.
pub use portrait_core::models::{ImageDescriptor, UserProfile};

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client(url: &str) -> ApiClient {
        ApiClient::new(url, Duration::from_secs(5), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_require_token() {
        assert_eq!(require_token(Some("abc")).unwrap(), "abc");
        assert!(matches!(
            require_token(Some("   ")),
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(require_token(None), Err(AppError::Authentication(_))));
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = client("http://localhost:8080/api/");
        assert_eq!(client.base_url(), "http://localhost:8080/api");
        assert_eq!(
            client.build_url("/users/me"),
            "http://localhost:8080/api/users/me"
        );
    }

    #[test]
    fn test_from_config() {
        let config = ClientConfig {
            api_url: "https://api.example.com/api/".to_string(),
            transfer_timeout_secs: 7,
            ..ClientConfig::default()
        };
        let client = ApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/api");
        assert_eq!(client.transfer_timeout(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_get_sends_bearer_and_parses_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let value: serde_json::Value = client(&server.url())
            .get("/ping", Some("tok"), "fallback")
            .await
            .unwrap();
        assert_eq!(value, json!({"ok": true}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_without_token_sends_no_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/public")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let _: serde_json::Value = client(&server.url())
            .get("/public", None, "fallback")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/things")
            .with_status(422)
            .with_body(r#"{"message":"Username already taken"}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .post_json::<serde_json::Value, _>("/things", "tok", &json!({}), "Failed")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AppError::Backend {
                status: 422,
                message: "Username already taken".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/broken")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server.url())
            .get::<serde_json::Value>("/broken", Some("tok"), "Failed")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let err = client("http://127.0.0.1:9")
            .get::<serde_json::Value>("/users/me", Some("tok"), "Failed")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
