//! Adapter traits connecting typed resources to the host.
//!
//! Each Azure entity type implements [`ResourceAdapter`] (or
//! [`DataSourceAdapter`]) with its own state model and ID type. The host only
//! speaks JSON, so every adapter is also usable as a [`DynResource`] /
//! [`DynDataSource`]; those blanket implementations own the pieces every
//! resource shares: schema validation, the `id` attribute, read-after-write,
//! per-operation timeouts, and import.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::ArmClient;
use crate::error::{ProviderError, ProviderResult};
use crate::features::ProviderFeatures;
use crate::ids::ResourceIdentifier;
use crate::schema::{Attribute, Schema};

/// Everything an adapter needs to reach Azure.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    pub client: ArmClient,
    pub features: ProviderFeatures,
}

impl ResourceContext {
    pub fn new(client: ArmClient, features: ProviderFeatures) -> Self {
        Self { client, features }
    }

    pub fn subscription_id(&self) -> &str {
        self.client.subscription_id()
    }
}

/// Upper bounds for each operation, including any long-running polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// Run `fut`, failing with [`ProviderError::Timeout`] after `after`.
pub async fn with_timeout<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<T> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| ProviderError::Timeout { operation, after })?
}

/// A typed resource adapter for one Azure entity type.
#[async_trait]
pub trait ResourceAdapter: Send + Sync + 'static {
    /// The declarative state: configuration plus computed attributes.
    type Model: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// The ARM ID the resource is tracked by.
    type Id: ResourceIdentifier;

    /// Host-facing type name (`azurerm_cognitive_account`, ...).
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Cross-field checks the schema cannot express.
    fn validate(&self, _model: &Self::Model) -> ProviderResult<()> {
        Ok(())
    }

    /// Create the resource and return its ID. Must refuse to adopt an
    /// existing remote object.
    async fn create(&self, ctx: &ResourceContext, model: &Self::Model) -> ProviderResult<Self::Id>;

    /// Read the resource. `Ok(None)` means it no longer exists.
    ///
    /// `prior` is the last known state; adapters copy write-only values
    /// (secrets ARM never returns) from it.
    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &Self::Id,
        prior: Option<&Self::Model>,
    ) -> ProviderResult<Option<Self::Model>>;

    /// Apply `model` to an existing resource.
    ///
    /// `prior` is the state being replaced. PATCH bodies leave omitted
    /// properties untouched, so adapters use it to send explicit values for
    /// blocks and fields the configuration removed.
    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &Self::Id,
        prior: &Self::Model,
        model: &Self::Model,
    ) -> ProviderResult<()>;

    async fn delete(&self, ctx: &ResourceContext, id: &Self::Id) -> ProviderResult<()>;

    async fn exists(&self, ctx: &ResourceContext, id: &Self::Id) -> ProviderResult<bool> {
        Ok(self.read(ctx, id, None).await?.is_some())
    }
}

/// Fail with [`ProviderError::AlreadyExists`] unless `lookup` reports 404.
///
/// Every adapter runs this before creating so existing infrastructure is
/// imported rather than silently adopted.
pub async fn ensure_absent<T>(
    resource_type: &str,
    id: &impl Display,
    lookup: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<()> {
    match lookup.await {
        Ok(_) => Err(ProviderError::AlreadyExists {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// JSON-facing view of a resource adapter.
#[async_trait]
pub trait DynResource: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// The adapter schema plus the computed `id` attribute.
    fn schema(&self) -> Schema;

    fn validate_config(&self, config: &serde_json::Value) -> ProviderResult<()>;

    async fn create(
        &self,
        ctx: &ResourceContext,
        config: serde_json::Value,
    ) -> ProviderResult<serde_json::Value>;

    async fn read(
        &self,
        ctx: &ResourceContext,
        state: serde_json::Value,
    ) -> ProviderResult<Option<serde_json::Value>>;

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: serde_json::Value,
        planned: serde_json::Value,
    ) -> ProviderResult<serde_json::Value>;

    async fn delete(&self, ctx: &ResourceContext, state: serde_json::Value) -> ProviderResult<()>;

    async fn exists(&self, ctx: &ResourceContext, id: &str) -> ProviderResult<bool>;

    async fn import(&self, ctx: &ResourceContext, id: &str) -> ProviderResult<serde_json::Value>;
}

fn state_id(state: &serde_json::Value) -> ProviderResult<&str> {
    state
        .get("id")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Validation("state has no `id` attribute".into()))
}

fn to_state(id: &impl Display, model: &impl Serialize) -> ProviderResult<serde_json::Value> {
    let mut state = serde_json::to_value(model)?;
    if let Some(object) = state.as_object_mut() {
        object.insert("id".to_string(), serde_json::Value::String(id.to_string()));
    }
    Ok(state)
}

#[async_trait]
impl<R: ResourceAdapter> DynResource for R {
    fn type_name(&self) -> &'static str {
        ResourceAdapter::type_name(self)
    }

    fn schema(&self) -> Schema {
        ResourceAdapter::schema(self).attribute("id", Attribute::computed_string())
    }

    fn validate_config(&self, config: &serde_json::Value) -> ProviderResult<()> {
        DynResource::schema(self).validate(config)?;
        let model: R::Model = serde_json::from_value(config.clone())?;
        self.validate(&model)
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        config: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        let model: R::Model = serde_json::from_value(config)?;
        self.validate(&model)?;

        let resource_type = ResourceAdapter::type_name(self);
        let timeouts = self.timeouts();
        tracing::debug!(resource_type, "creating resource");

        let id = with_timeout(
            "create",
            timeouts.create,
            ResourceAdapter::create(self, ctx, &model),
        )
        .await?;

        let created = with_timeout(
            "read",
            timeouts.read,
            ResourceAdapter::read(self, ctx, &id, Some(&model)),
        )
        .await?
        .ok_or_else(|| ProviderError::NotFound(format!("{resource_type} {id} after creation")))?;

        tracing::debug!(resource_type, %id, "resource created");
        to_state(&id, &created)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        state: serde_json::Value,
    ) -> ProviderResult<Option<serde_json::Value>> {
        let id: R::Id = state_id(&state)?.parse()?;
        let prior: Option<R::Model> = serde_json::from_value(state).ok();

        let current = with_timeout(
            "read",
            self.timeouts().read,
            ResourceAdapter::read(self, ctx, &id, prior.as_ref()),
        )
        .await?;

        match current {
            Some(model) => Ok(Some(to_state(&id, &model)?)),
            None => {
                tracing::warn!(
                    resource_type = ResourceAdapter::type_name(self),
                    %id,
                    "resource was not found - removing from state"
                );
                Ok(None)
            }
        }
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        prior: serde_json::Value,
        planned: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        let id: R::Id = state_id(&prior)?.parse()?;
        let prior: R::Model = serde_json::from_value(prior)?;
        let model: R::Model = serde_json::from_value(planned)?;
        self.validate(&model)?;

        let timeouts = self.timeouts();
        tracing::debug!(resource_type = ResourceAdapter::type_name(self), %id, "updating resource");

        with_timeout(
            "update",
            timeouts.update,
            ResourceAdapter::update(self, ctx, &id, &prior, &model),
        )
        .await?;

        let updated = with_timeout(
            "read",
            timeouts.read,
            ResourceAdapter::read(self, ctx, &id, Some(&model)),
        )
        .await?
        .ok_or_else(|| {
            ProviderError::NotFound(format!(
                "{} {id} after update",
                ResourceAdapter::type_name(self)
            ))
        })?;

        to_state(&id, &updated)
    }

    async fn delete(&self, ctx: &ResourceContext, state: serde_json::Value) -> ProviderResult<()> {
        let id: R::Id = state_id(&state)?.parse()?;
        tracing::debug!(resource_type = ResourceAdapter::type_name(self), %id, "deleting resource");

        with_timeout(
            "delete",
            self.timeouts().delete,
            ResourceAdapter::delete(self, ctx, &id),
        )
        .await
    }

    async fn exists(&self, ctx: &ResourceContext, id: &str) -> ProviderResult<bool> {
        let id: R::Id = id.parse()?;
        with_timeout(
            "read",
            self.timeouts().read,
            ResourceAdapter::exists(self, ctx, &id),
        )
        .await
    }

    async fn import(&self, ctx: &ResourceContext, id: &str) -> ProviderResult<serde_json::Value> {
        let id: R::Id = id.parse()?;
        let model = with_timeout(
            "read",
            self.timeouts().read,
            ResourceAdapter::read(self, ctx, &id, None),
        )
        .await?
        .ok_or_else(|| {
            ProviderError::NotFound(format!(
                "{} {id} to import",
                ResourceAdapter::type_name(self)
            ))
        })?;

        to_state(&id, &model)
    }
}

/// A typed, read-only lookup of existing Azure objects.
#[async_trait]
pub trait DataSourceAdapter: Send + Sync + 'static {
    /// The lookup arguments.
    type Args: DeserializeOwned + Send + Sync;

    /// Everything the lookup exposes.
    type Model: Serialize + Send + Sync;

    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn read_timeout(&self) -> Duration {
        Timeouts::default().read
    }

    /// Resolve the arguments to an ID and the current attributes.
    async fn read(
        &self,
        ctx: &ResourceContext,
        args: &Self::Args,
    ) -> ProviderResult<(String, Self::Model)>;
}

/// JSON-facing view of a data source.
#[async_trait]
pub trait DynDataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(
        &self,
        ctx: &ResourceContext,
        config: serde_json::Value,
    ) -> ProviderResult<serde_json::Value>;
}

#[async_trait]
impl<D: DataSourceAdapter> DynDataSource for D {
    fn type_name(&self) -> &'static str {
        DataSourceAdapter::type_name(self)
    }

    fn schema(&self) -> Schema {
        DataSourceAdapter::schema(self).attribute("id", Attribute::computed_string())
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        config: serde_json::Value,
    ) -> ProviderResult<serde_json::Value> {
        DynDataSource::schema(self).validate(&config)?;
        let args: D::Args = serde_json::from_value(config)?;

        let (id, model) = with_timeout(
            "read",
            self.read_timeout(),
            DataSourceAdapter::read(self, ctx, &args),
        )
        .await?;

        to_state(&id, &model)
    }
}
