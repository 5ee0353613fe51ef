//! HTTP client for Azure Resource Manager.
//!
//! This module provides [`ArmClient`], the transport every resource adapter
//! goes through. The client handles authentication, retries on transient
//! failures, error-envelope decoding, and the subscription the provider is
//! scoped to.
//!
//! # Examples
//!
//! ## Using the Azure CLI
//! ```rust,no_run
//! use azure_cognitive_core::auth::ArmCredential;
//! use azure_cognitive_core::client::ArmClient;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .subscription_id("00000000-0000-0000-0000-000000000000")
//!     .credential(ArmCredential::azure_cli()?)
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using a Custom TokenCredential
//! ```rust,no_run
//! use azure_cognitive_core::auth::ArmCredential;
//! use azure_cognitive_core::client::ArmClient;
//! use azure_identity::ClientSecretCredential;
//! use azure_core::credentials::Secret;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credential = ClientSecretCredential::new(
//!     "tenant-id",
//!     "client-id".to_string(),
//!     Secret::new("client-secret"),
//!     None,
//! )?;
//!
//! let client = ArmClient::builder()
//!     .subscription_id("00000000-0000-0000-0000-000000000000")
//!     .credential(ArmCredential::token_credential(credential))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::ArmCredential;
use crate::error::{ProviderError, ProviderResult};
use reqwest::{Client as HttpClient, Method};
use url::Url;

use std::time::Duration;

/// Public-cloud Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com/";

/// Environment variable overriding the Resource Manager endpoint.
pub const ENDPOINT_ENV: &str = "ARM_RESOURCE_MANAGER_ENDPOINT";

/// Environment variable holding the target subscription.
pub const SUBSCRIPTION_ENV: &str = "ARM_SUBSCRIPTION_ID";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Default delay between long-running-operation polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 408 Request Timeout
/// - 429 Too Many Requests (ARM throttling)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff),
    /// capped at [`MAX_BACKOFF`].
    pub initial_backoff: Duration,
}

/// Longest delay between two attempts, before jitter.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

impl RetryPolicy {
    /// Delay before retry number `attempt` (starting at 0), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(MAX_BACKOFF, |backoff| backoff.min(MAX_BACKOFF))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// The client every resource adapter uses to talk to Resource Manager.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) subscription_id: String,
    pub(crate) credential: ArmCredential,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) poll_interval: Duration,
}

/// Builder for constructing an [`ArmClient`].
///
/// Use [`ArmClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ArmClientBuilder {
    endpoint: Option<String>,
    subscription_id: Option<String>,
    credential: Option<ArmCredential>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    poll_interval: Option<Duration>,
}

impl ArmClient {
    /// Create a new builder for configuring an `ArmClient`.
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    /// Get the Resource Manager endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the subscription this client manages resources in.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Get the delay between long-running-operation polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The OAuth scope tokens are requested for.
    pub fn scope(&self) -> String {
        format!("{}.default", self.endpoint)
    }

    /// Build a full URL for an API path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined to the endpoint URL.
    pub fn url(&self, path: &str) -> ProviderResult<Url> {
        self.endpoint
            .join(path)
            .map_err(|e| ProviderError::invalid_endpoint_with_source("failed to construct URL", e))
    }

    /// Send a GET request.
    pub async fn get(&self, path: &str) -> ProviderResult<reqwest::Response> {
        self.send(Method::GET, path, None::<&()>).await
    }

    /// Follow an absolute URL returned by ARM (e.g. `Azure-AsyncOperation`).
    ///
    /// Only the path and query are kept; the host is always the configured
    /// endpoint, so tokens are never sent to a foreign host.
    pub async fn get_url(&self, absolute: &str) -> ProviderResult<reqwest::Response> {
        let parsed = Url::parse(absolute).map_err(|e| {
            ProviderError::invalid_endpoint_with_source("failed to parse operation URL", e)
        })?;

        let relative_path = match parsed.query() {
            Some(q) => format!("{}?{q}", parsed.path()),
            None => parsed.path().to_string(),
        };

        self.get(&relative_path).await
    }

    /// Send a PUT request with a JSON body.
    pub async fn put<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ProviderResult<reqwest::Response> {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// Send a PATCH request with a JSON body.
    pub async fn patch<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> ProviderResult<reqwest::Response> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    /// Send a POST request, with an optional JSON body.
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&T>,
    ) -> ProviderResult<reqwest::Response> {
        self.send(Method::POST, path, body).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> ProviderResult<reqwest::Response> {
        self.send(Method::DELETE, path, None::<&()>).await
    }

    /// Send a request with automatic retry on transient errors.
    ///
    /// Retries on retriable HTTP errors with exponential backoff and jitter.
    async fn send<T: serde::Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&T>,
    ) -> ProviderResult<reqwest::Response> {
        let url = self.url(path)?;
        let auth = self.credential.resolve(&self.scope()).await?;

        let mut attempt = 0;
        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("Authorization", &auth);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();

            if response.status().is_success() {
                return Ok(response);
            }

            // Non-retriable error or last attempt - return error
            if !is_retriable_status(status) || attempt == self.retry_policy.max_retries {
                return Self::check_response(response).await;
            }

            // jitter_factor is in range [0.75, 1.25] for ±25% variation
            let base_backoff = self.retry_policy.backoff(attempt);
            let jitter = 0.75 + fastrand::f64() * 0.5;
            let backoff = base_backoff.mul_f64(jitter);
            tracing::debug!(%method, status, attempt, ?backoff, "retrying ARM request");
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Maximum length for error messages to prevent sensitive data leaks.
    const MAX_ERROR_MESSAGE_LEN: usize = 1000;

    /// Redact bearer tokens from an error message.
    pub(crate) fn sanitize_error_message(msg: &str) -> String {
        let mut result = msg.to_string();

        // Use offset to avoid infinite loops
        let mut search_start = 0;
        while let Some(relative_pos) = result[search_start..].find("Bearer ") {
            let token_start = search_start + relative_pos + 7;
            if token_start >= result.len() {
                break;
            }

            if result[token_start..].starts_with("[REDACTED]") {
                search_start = token_start + 10;
                continue;
            }

            let token_end = result[token_start..]
                .find(|c: char| c.is_whitespace() || c == '"' || c == '\'' || c == ',')
                .map(|pos| token_start + pos)
                .unwrap_or(result.len());

            if token_end > token_start {
                result.replace_range(token_start..token_end, "[REDACTED]");
                search_start = token_start + 10;
            } else {
                search_start = token_start;
            }
        }

        result
    }

    /// Truncate a message if it exceeds the maximum length.
    /// Also sanitizes sensitive data before truncating.
    pub(crate) fn truncate_message(msg: &str) -> String {
        let sanitized = Self::sanitize_error_message(msg);

        if sanitized.len() > Self::MAX_ERROR_MESSAGE_LEN {
            let mut cut = Self::MAX_ERROR_MESSAGE_LEN;
            while !sanitized.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}... (truncated)", &sanitized[..cut])
        } else {
            sanitized
        }
    }

    /// Turn a non-success response into an error.
    async fn check_response(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if let Ok(error) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(err_obj) = error.get("error") {
                return Err(ProviderError::Api {
                    status,
                    code: err_obj
                        .get("code")
                        .and_then(|c| c.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    message: Self::truncate_message(
                        err_obj
                            .get("message")
                            .and_then(|m| m.as_str())
                            .unwrap_or(&body),
                    ),
                });
            }
        }

        Err(ProviderError::http(status, Self::truncate_message(&body)))
    }
}

impl ArmClientBuilder {
    /// Set the Resource Manager endpoint.
    ///
    /// Falls back to `ARM_RESOURCE_MANAGER_ENDPOINT`, then to
    /// [`DEFAULT_ENDPOINT`].
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the subscription ID. Falls back to `ARM_SUBSCRIPTION_ID`.
    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, [`ArmCredential::from_env()`] is used.
    pub fn credential(mut self, credential: ArmCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout configuration
    /// on this builder is ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout for a single request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Set the delay between long-running-operation polls.
    ///
    /// Defaults to [`DEFAULT_POLL_INTERVAL`]. A `Retry-After` header on an
    /// operation response takes precedence.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Build the `ArmClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No subscription is provided and `ARM_SUBSCRIPTION_ID` is not set
    /// - The endpoint URL is invalid
    /// - Credential creation fails (when using environment-based credentials)
    pub fn build(self) -> ProviderResult<ArmClient> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let subscription_id = self
            .subscription_id
            .or_else(|| std::env::var(SUBSCRIPTION_ENV).ok())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::MissingConfig(
                    "subscription_id is required. Set it via builder or ARM_SUBSCRIPTION_ID env var."
                        .into(),
                )
            })?;

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ProviderError::invalid_endpoint_with_source("invalid endpoint URL", e))?;

        let credential = match self.credential {
            Some(credential) => credential,
            None => ArmCredential::from_env()?,
        };

        Ok(ArmClient {
            http,
            endpoint,
            subscription_id,
            credential,
            retry_policy: self.retry_policy.unwrap_or_default(),
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn restore_env(key: &str, original: Option<String>) {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }

    #[test]
    #[serial]
    fn builder_requires_subscription() {
        let original = std::env::var(SUBSCRIPTION_ENV).ok();
        std::env::remove_var(SUBSCRIPTION_ENV);

        let result = ArmClient::builder()
            .credential(ArmCredential::static_token("test"))
            .build();

        assert!(matches!(result, Err(ProviderError::MissingConfig(_))));
        restore_env(SUBSCRIPTION_ENV, original);
    }

    #[test]
    #[serial]
    fn builder_uses_subscription_from_env() {
        let original = std::env::var(SUBSCRIPTION_ENV).ok();
        std::env::set_var(SUBSCRIPTION_ENV, "sub-from-env");

        let client = ArmClient::builder()
            .credential(ArmCredential::static_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.subscription_id(), "sub-from-env");
        restore_env(SUBSCRIPTION_ENV, original);
    }

    #[test]
    #[serial]
    fn builder_defaults_to_public_cloud_endpoint() {
        let original = std::env::var(ENDPOINT_ENV).ok();
        std::env::remove_var(ENDPOINT_ENV);

        let client = ArmClient::builder()
            .subscription_id("sub")
            .credential(ArmCredential::static_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.endpoint().as_str(), DEFAULT_ENDPOINT);
        assert_eq!(client.scope(), "https://management.azure.com/.default");
        restore_env(ENDPOINT_ENV, original);
    }

    #[test]
    #[serial]
    fn builder_endpoint_overrides_env() {
        let original = std::env::var(ENDPOINT_ENV).ok();
        std::env::set_var(ENDPOINT_ENV, "https://management.chinacloudapi.cn");

        let client = ArmClient::builder()
            .endpoint("https://management.usgovcloudapi.net")
            .subscription_id("sub")
            .credential(ArmCredential::static_token("test"))
            .build()
            .expect("should build");

        assert_eq!(
            client.endpoint().as_str(),
            "https://management.usgovcloudapi.net/"
        );
        restore_env(ENDPOINT_ENV, original);
    }

    #[test]
    fn builder_invalid_endpoint_url() {
        let result = ArmClient::builder()
            .endpoint("not a valid url")
            .subscription_id("sub")
            .credential(ArmCredential::static_token("test"))
            .build();

        assert!(matches!(
            result,
            Err(ProviderError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn default_retry_and_poll_settings() {
        let client = ArmClient::builder()
            .endpoint(DEFAULT_ENDPOINT)
            .subscription_id("sub")
            .credential(ArmCredential::static_token("test"))
            .build()
            .expect("should build");

        assert_eq!(client.retry_policy().max_retries, 3);
        assert_eq!(
            client.retry_policy().initial_backoff,
            Duration::from_millis(500)
        );
        assert_eq!(client.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let policy = RetryPolicy {
            max_retries: 64,
            initial_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), MAX_BACKOFF);
        assert_eq!(policy.backoff(40), MAX_BACKOFF);
        assert_eq!(policy.backoff(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn url_joins_resource_path() {
        let client = ArmClient::builder()
            .endpoint(DEFAULT_ENDPOINT)
            .subscription_id("sub")
            .credential(ArmCredential::static_token("test"))
            .build()
            .expect("should build");

        let url = client
            .url("/subscriptions/sub/resourceGroups/rg?api-version=2025-06-01")
            .expect("should join");
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/sub/resourceGroups/rg?api-version=2025-06-01"
        );
    }

    #[test]
    fn identifies_retriable_http_errors() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_retriable_status(status), "{status} should retry");
        }
        for status in [200, 201, 400, 401, 403, 404, 409] {
            assert!(!is_retriable_status(status), "{status} should not retry");
        }
    }

    // --- Wiremock tests ---

    async fn setup_mock_client(server: &MockServer) -> ArmClient {
        ArmClient::builder()
            .endpoint(server.uri())
            .subscription_id("sub")
            .credential(ArmCredential::static_token("test-token"))
            .retry_policy(RetryPolicy {
                max_retries: 2,
                initial_backoff: Duration::from_millis(5),
            })
            .build()
            .expect("should build client")
    }

    #[tokio::test]
    async fn get_sends_bearer_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/subscriptions/sub"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"state": "Enabled"})),
            )
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client.get("/subscriptions/sub").await.expect("should succeed");
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["state"], "Enabled");
    }

    #[tokio::test]
    async fn put_sends_json_body() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/things/a"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({"location": "westeurope"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client
            .put("/things/a", &serde_json::json!({"location": "westeurope"}))
            .await
            .expect("should succeed");
        assert_eq!(response.status(), 201);
    }

    #[tokio::test]
    async fn not_found_envelope_maps_to_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/things/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {
                    "code": "ResourceNotFound",
                    "message": "The Resource 'missing' was not found."
                }
            })))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let err = client.get("/things/missing").await.unwrap_err();

        assert!(err.is_not_found());
        match err {
            ProviderError::Api { code, .. } => assert_eq!(code, "ResourceNotFound"),
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_error_maps_to_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/things/a"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Conflict"))
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        match client.delete("/things/a").await.unwrap_err() {
            ProviderError::Http { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Conflict");
            }
            other => panic!("Expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn retries_throttled_requests() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc;

        let server = MockServer::start().await;
        let request_count = Arc::new(AtomicU32::new(0));
        let counter = request_count.clone();

        Mock::given(method("PATCH"))
            .and(path("/things/a"))
            .respond_with(move |_req: &wiremock::Request| {
                if counter.fetch_add(1, Ordering::SeqCst) < 1 {
                    ResponseTemplate::new(429).set_body_string("Too Many Requests")
                } else {
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({}))
                }
            })
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let result = client.patch("/things/a", &serde_json::json!({})).await;

        assert!(result.is_ok(), "Expected success after retry, got {result:?}");
        assert_eq!(request_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/things/a"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(3)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let err = client.get("/things/a").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn get_url_keeps_path_and_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/providers/Microsoft.CognitiveServices/operations/op-1"))
            .and(wiremock::matchers::query_param("api-version", "2025-06-01"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "Succeeded"})),
            )
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        let response = client
            .get_url("https://management.azure.com/providers/Microsoft.CognitiveServices/operations/op-1?api-version=2025-06-01")
            .await
            .expect("should follow operation URL");
        assert_eq!(response.status(), 200);
    }

    #[test]
    fn sanitization_redacts_bearer_tokens() {
        let msg = "Token Bearer abc123 rejected, retry with Bearer def456";
        let result = ArmClient::sanitize_error_message(msg);

        assert!(!result.contains("abc123"));
        assert!(!result.contains("def456"));
        assert_eq!(result.matches("[REDACTED]").count(), 2);
    }

    #[test]
    fn sanitization_preserves_legitimate_errors() {
        let msg = "The subscription is not registered to use namespace 'Microsoft.CognitiveServices'.";
        assert_eq!(ArmClient::sanitize_error_message(msg), msg);
    }

    #[test]
    fn long_messages_are_truncated() {
        let msg = "x".repeat(1500);
        let result = ArmClient::truncate_message(&msg);
        assert!(result.ends_with("... (truncated)"));
        assert!(result.len() < 1100);
    }
}
