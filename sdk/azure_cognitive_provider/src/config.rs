//! Provider configuration.
//!
//! Every field is optional in the host's provider block. Unset values fall
//! back to the same environment variables the ARM client builder reads.

use std::time::Duration;

use azure_cognitive_core::auth::{ArmCredential, ACCESS_TOKEN_ENV};
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::ProviderResult;
use azure_cognitive_core::features::ProviderFeatures;
use azure_cognitive_core::resource::ResourceContext;
use azure_cognitive_core::schema::{Attribute, AttributeType, Block, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

/// The provider block.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub subscription_id: Option<String>,
    pub resource_manager_endpoint: Option<String>,
    pub access_token: Option<String>,
    pub poll_interval_seconds: Option<u64>,
    pub features: ProviderFeatures,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("subscription_id", &self.subscription_id)
            .field("resource_manager_endpoint", &self.resource_manager_endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "****"))
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("features", &self.features)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::new()
            .attribute("subscription_id", Attribute::optional_string())
            .attribute("resource_manager_endpoint", Attribute::optional_string())
            .attribute("access_token", Attribute::optional_string().sensitive())
            .attribute("poll_interval_seconds", Attribute::optional(AttributeType::Int))
            .block(
                "features",
                Block::single(
                    false,
                    Schema::new().block(
                        "cognitive_account",
                        Block::single(
                            false,
                            Schema::new().attribute(
                                "purge_soft_delete_on_destroy",
                                Attribute::optional_bool().default_value(true),
                            ),
                        ),
                    ),
                ),
            )
    }

    /// Validate and deserialize a provider block.
    pub fn from_value(value: serde_json::Value) -> ProviderResult<Self> {
        Self::schema().validate(&value)?;
        let config: Self = serde_json::from_value(value)?;
        if let Some(endpoint) = &config.resource_manager_endpoint {
            validate::url("resource_manager_endpoint", endpoint)?;
        }
        Ok(config)
    }

    /// The credential this configuration selects: `access_token`, then
    /// `ARM_ACCESS_TOKEN`, then the Azure CLI.
    pub fn credential(&self) -> ProviderResult<ArmCredential> {
        match self.access_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Ok(ArmCredential::static_token(token)),
            None => ArmCredential::from_env(),
        }
    }

    /// Build the context every adapter runs with.
    pub fn build_context(&self) -> ProviderResult<ResourceContext> {
        self.build_context_with(self.credential()?)
    }

    /// Build the context with an explicit credential.
    pub fn build_context_with(&self, credential: ArmCredential) -> ProviderResult<ResourceContext> {
        let mut builder = ArmClient::builder().credential(credential);
        if let Some(subscription_id) = &self.subscription_id {
            builder = builder.subscription_id(subscription_id);
        }
        if let Some(endpoint) = &self.resource_manager_endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(seconds) = self.poll_interval_seconds {
            builder = builder.poll_interval(Duration::from_secs(seconds));
        }

        let client = builder.build()?;
        tracing::debug!(
            subscription_id = client.subscription_id(),
            endpoint = %client.endpoint(),
            token_from_env = self.access_token.is_none() && std::env::var(ACCESS_TOKEN_ENV).is_ok(),
            "provider configured"
        );
        Ok(ResourceContext::new(client, self.features.clone()))
    }
}
