//! The resource registry the host talks to.
//!
//! [`Provider`] maps host type names to adapters and forwards each call with
//! the configured [`ResourceContext`]. Unknown type names fail with
//! [`ProviderError::UnsupportedType`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use azure_cognitive_accounts::account::CognitiveAccountResource;
use azure_cognitive_accounts::ai_services::AiServicesResource;
use azure_cognitive_accounts::commitment_plan::CommitmentPlanResource;
use azure_cognitive_accounts::customer_managed_key::CustomerManagedKeyResource;
use azure_cognitive_accounts::data_source::{AccountDataSource, DeploymentDataSource};
use azure_cognitive_accounts::deployment::DeploymentResource;
use azure_cognitive_core::error::{ProviderError, ProviderResult};
use azure_cognitive_core::resource::{DynDataSource, DynResource, ResourceContext};
use azure_cognitive_core::schema::Schema;
use azure_cognitive_foundry::connection::ConnectionResource;
use azure_cognitive_foundry::project::ProjectResource;
use azure_cognitive_safety::rai_blocklist::RaiBlocklistResource;
use azure_cognitive_safety::rai_blocklist_item::RaiBlocklistItemResource;
use azure_cognitive_safety::rai_policy::RaiPolicyResource;

use crate::config::ProviderConfig;

/// Every resource and data source of the provider, bound to one context.
#[derive(Clone)]
pub struct Provider {
    context: ResourceContext,
    resources: BTreeMap<&'static str, Arc<dyn DynResource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DynDataSource>>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("context", &self.context)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Provider {
    /// Register every adapter against `context`.
    pub fn new(context: ResourceContext) -> Self {
        let mut provider = Self {
            context,
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
        };

        provider.register_resource(CognitiveAccountResource);
        provider.register_resource(AiServicesResource);
        provider.register_resource(CustomerManagedKeyResource);
        provider.register_resource(DeploymentResource);
        provider.register_resource(CommitmentPlanResource);
        provider.register_resource(ProjectResource);
        provider.register_resource(ConnectionResource);
        provider.register_resource(RaiPolicyResource);
        provider.register_resource(RaiBlocklistResource);
        provider.register_resource(RaiBlocklistItemResource);

        provider.register_data_source(AccountDataSource);
        provider.register_data_source(DeploymentDataSource);

        provider
    }

    /// Build the context from `config` and register every adapter.
    pub fn configure(config: &ProviderConfig) -> ProviderResult<Self> {
        Ok(Self::new(config.build_context()?))
    }

    fn register_resource(&mut self, resource: impl DynResource + 'static) {
        self.resources.insert(resource.type_name(), Arc::new(resource));
    }

    fn register_data_source(&mut self, data_source: impl DynDataSource + 'static) {
        self.data_sources
            .insert(data_source.type_name(), Arc::new(data_source));
    }

    pub fn context(&self) -> &ResourceContext {
        &self.context
    }

    /// Resource type names, sorted.
    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    /// Data source type names, sorted.
    pub fn data_source_types(&self) -> Vec<&'static str> {
        self.data_sources.keys().copied().collect()
    }

    fn resource(&self, type_name: &str) -> ProviderResult<&dyn DynResource> {
        self.resources
            .get(type_name)
            .map(|resource| resource.as_ref())
            .ok_or_else(|| ProviderError::UnsupportedType {
                kind: "resource",
                name: type_name.to_string(),
            })
    }

    fn data_source(&self, type_name: &str) -> ProviderResult<&dyn DynDataSource> {
        self.data_sources
            .get(type_name)
            .map(|data_source| data_source.as_ref())
            .ok_or_else(|| ProviderError::UnsupportedType {
                kind: "data source",
                name: type_name.to_string(),
            })
    }

    pub fn resource_schema(&self, type_name: &str) -> ProviderResult<Schema> {
        Ok(self.resource(type_name)?.schema())
    }

    pub fn data_source_schema(&self, type_name: &str) -> ProviderResult<Schema> {
        Ok(self.data_source(type_name)?.schema())
    }

    /// Check `config` against the schema and the adapter's own rules.
    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &serde_json::Value,
    ) -> ProviderResult<()> {
        self.resource(type_name)?.validate_config(config)
    }

    /// Create a resource and return its state.
    ///
    /// # Tracing
    ///
    /// Emits a span named `cognitive::provider::create` with field
    /// `resource_type`.
    #[tracing::instrument(
        name = "cognitive::provider::create",
        skip(self, config),
        fields(resource_type = type_name)
    )]
    pub async fn create(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        self.resource(type_name)?.create(&self.context, config).await
    }

    /// Refresh a resource. `Ok(None)` means it is gone and should be dropped
    /// from state.
    ///
    /// # Tracing
    ///
    /// Emits a span named `cognitive::provider::read` with field
    /// `resource_type`.
    #[tracing::instrument(
        name = "cognitive::provider::read",
        skip(self, state),
        fields(resource_type = type_name)
    )]
    pub async fn read(
        &self,
        type_name: &str,
        state: serde_json::Value,
    ) -> ProviderResult<Option<serde_json::Value>> {
        self.resource(type_name)?.read(&self.context, state).await
    }

    /// Apply `planned` over `prior` and return the new state.
    ///
    /// # Tracing
    ///
    /// Emits a span named `cognitive::provider::update` with field
    /// `resource_type`.
    #[tracing::instrument(
        name = "cognitive::provider::update",
        skip(self, prior, planned),
        fields(resource_type = type_name)
    )]
    pub async fn update(
        &self,
        type_name: &str,
        prior: serde_json::Value,
        planned: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        self.resource(type_name)?
            .update(&self.context, prior, planned)
            .await
    }

    /// Destroy a resource.
    ///
    /// # Tracing
    ///
    /// Emits a span named `cognitive::provider::delete` with field
    /// `resource_type`.
    #[tracing::instrument(
        name = "cognitive::provider::delete",
        skip(self, state),
        fields(resource_type = type_name)
    )]
    pub async fn delete(&self, type_name: &str, state: serde_json::Value) -> ProviderResult<()> {
        self.resource(type_name)?.delete(&self.context, state).await
    }

    #[tracing::instrument(name = "cognitive::provider::exists", skip(self), fields(resource_type = type_name))]
    pub async fn exists(&self, type_name: &str, id: &str) -> ProviderResult<bool> {
        self.resource(type_name)?.exists(&self.context, id).await
    }

    /// Adopt an existing Azure object by ID.
    ///
    /// # Tracing
    ///
    /// Emits a span named `cognitive::provider::import` with fields
    /// `resource_type` and `id`.
    #[tracing::instrument(name = "cognitive::provider::import", skip(self), fields(resource_type = type_name))]
    pub async fn import(&self, type_name: &str, id: &str) -> ProviderResult<serde_json::Value> {
        self.resource(type_name)?.import(&self.context, id).await
    }

    #[tracing::instrument(
        name = "cognitive::provider::read_data_source",
        skip(self, config),
        fields(data_source_type = type_name)
    )]
    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        self.data_source(type_name)?.read(&self.context, config).await
    }
}
