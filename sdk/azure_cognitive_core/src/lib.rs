#![doc = include_str!("../README.md")]

pub mod auth;
pub mod client;
pub mod error;
pub mod features;
pub mod ids;
pub mod locks;
pub mod lro;
pub mod models;
pub mod resource;
pub mod schema;
pub mod validate;

pub use error::{ProviderError, ProviderResult};

/// Mock-server helpers shared by this crate's tests and the adapter crates.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use std::time::Duration;

    use wiremock::MockServer;

    use crate::auth::ArmCredential;
    use crate::client::{ArmClient, RetryPolicy};
    use crate::features::ProviderFeatures;
    use crate::resource::ResourceContext;

    /// Bearer token the mock client sends (not a real token).
    pub const TEST_TOKEN: &str = "test-token";

    /// Subscription every test ID lives in.
    pub const TEST_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

    /// Create a client pointed at `server` that polls and retries quickly.
    pub async fn setup_mock_client(server: &MockServer) -> ArmClient {
        ArmClient::builder()
            .endpoint(server.uri())
            .subscription_id(TEST_SUBSCRIPTION)
            .credential(ArmCredential::static_token(TEST_TOKEN))
            .retry_policy(RetryPolicy {
                max_retries: 1,
                initial_backoff: Duration::from_millis(5),
            })
            .poll_interval(Duration::from_millis(10))
            .build()
            .expect("should build client")
    }

    /// A [`ResourceContext`] over [`setup_mock_client`] with default features.
    pub async fn setup_context(server: &MockServer) -> ResourceContext {
        ResourceContext::new(setup_mock_client(server).await, ProviderFeatures::default())
    }
}
