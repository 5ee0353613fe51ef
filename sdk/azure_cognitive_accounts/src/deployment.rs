//! Model deployments (`azurerm_cognitive_deployment`).
//!
//! A deployment serves one model version from an account. ARM serializes
//! writes against the parent account, so create, update, and delete all
//! hold the account's named lock.

use async_trait::async_trait;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::{AccountId, DeploymentId};
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::models::{single_block, SkuPayload};
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Block, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::account;
use crate::models::API_VERSION;

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_deployment";

pub const VERSION_UPGRADE_OPTIONS: &[&str] = &[
    "OnceNewDefaultVersionAvailable",
    "OnceCurrentVersionExpired",
    "NoAutoUpgrade",
];

pub const SKU_NAMES: &[&str] = &[
    "Standard",
    "DataZoneBatch",
    "DataZoneStandard",
    "DataZoneProvisionedManaged",
    "GlobalBatch",
    "GlobalProvisionedManaged",
    "GlobalStandard",
    "ProvisionedManaged",
];

pub const SKU_TIERS: &[&str] = &["Free", "Basic", "Standard", "Premium", "Enterprise"];

// ---------------------------------------------------------------------------
// ARM payloads
// ---------------------------------------------------------------------------

/// A `Microsoft.CognitiveServices/accounts/deployments` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<SkuPayload>,
    #[serde(default)]
    pub properties: DeploymentProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<DeploymentModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rai_policy_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_upgrade_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_throttling_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentModel {
    pub format: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ---------------------------------------------------------------------------
// State model
// ---------------------------------------------------------------------------

fn default_upgrade_option() -> String {
    VERSION_UPGRADE_OPTIONS[0].to_string()
}

fn default_capacity() -> i64 {
    1
}

/// Declarative state of a deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deployment {
    pub name: String,
    pub cognitive_account_id: String,
    #[serde(deserialize_with = "single_block")]
    pub model: Option<ModelConfig>,
    #[serde(deserialize_with = "single_block")]
    pub sku: Option<SkuConfig>,
    pub rai_policy_name: Option<String>,
    pub version_upgrade_option: String,
    pub dynamic_throttling_enabled: bool,
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            name: String::new(),
            cognitive_account_id: String::new(),
            model: None,
            sku: None,
            rai_policy_name: None,
            version_upgrade_option: default_upgrade_option(),
            dynamic_throttling_enabled: false,
        }
    }
}

/// `model` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub format: String,
    pub name: String,
    pub version: Option<String>,
}

/// `sku` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuConfig {
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: i64,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("cognitive_account_id", Attribute::required_string().force_new())
        .block(
            "model",
            Block::single(
                true,
                Schema::new()
                    .attribute("format", Attribute::required_string().force_new())
                    .attribute("name", Attribute::required_string().force_new())
                    .attribute("version", Attribute::optional_computed(AttributeType::String)),
            ),
        )
        .block(
            "sku",
            Block::single(
                true,
                Schema::new()
                    .attribute("name", Attribute::required_string().force_new())
                    .attribute("tier", Attribute::optional_string())
                    .attribute("size", Attribute::optional_string())
                    .attribute("family", Attribute::optional_string())
                    .attribute(
                        "capacity",
                        Attribute::optional(AttributeType::Int).default_value(1),
                    ),
            ),
        )
        .attribute("rai_policy_name", Attribute::optional_string())
        .attribute(
            "version_upgrade_option",
            Attribute::optional(AttributeType::String)
                .default_value(VERSION_UPGRADE_OPTIONS[0]),
        )
        .attribute(
            "dynamic_throttling_enabled",
            Attribute::optional_bool().default_value(false),
        )
}

pub fn validate(model: &Deployment) -> ProviderResult<()> {
    validate::child_name("name", &model.name)?;
    model.cognitive_account_id.parse::<AccountId>()?;
    validate::one_of(
        "version_upgrade_option",
        &model.version_upgrade_option,
        VERSION_UPGRADE_OPTIONS,
    )?;

    let deployed = model
        .model
        .as_ref()
        .ok_or_else(|| ProviderError::Validation("a `model` block is required".into()))?;
    validate::not_empty("model.format", &deployed.format)?;
    validate::not_empty("model.name", &deployed.name)?;

    let sku = model
        .sku
        .as_ref()
        .ok_or_else(|| ProviderError::Validation("a `sku` block is required".into()))?;
    validate::one_of("sku.name", &sku.name, SKU_NAMES)?;
    if let Some(tier) = &sku.tier {
        validate::one_of("sku.tier", tier, SKU_TIERS)?;
    }
    if sku.capacity < 1 {
        return Err(ProviderError::Validation(format!(
            "sku.capacity must be at least 1, got {}",
            sku.capacity
        )));
    }

    if let Some(policy) = &model.rai_policy_name {
        validate::not_empty("rai_policy_name", policy)?;
    }
    Ok(())
}

pub fn expand(model: &Deployment) -> DeploymentPayload {
    DeploymentPayload {
        sku: model.sku.as_ref().map(|sku| SkuPayload {
            name: sku.name.clone(),
            tier: sku.tier.clone(),
            size: sku.size.clone(),
            family: sku.family.clone(),
            capacity: Some(sku.capacity),
        }),
        properties: DeploymentProperties {
            model: model.model.as_ref().map(|m| DeploymentModel {
                format: m.format.clone(),
                name: m.name.clone(),
                version: m.version.clone().filter(|v| !v.is_empty()),
            }),
            rai_policy_name: model.rai_policy_name.clone(),
            version_upgrade_option: Some(model.version_upgrade_option.clone()),
            dynamic_throttling_enabled: Some(model.dynamic_throttling_enabled),
            provisioning_state: None,
        },
        ..DeploymentPayload::default()
    }
}

pub fn flatten(id: &DeploymentId, payload: &DeploymentPayload) -> Deployment {
    let props = &payload.properties;
    Deployment {
        name: id.name.clone(),
        cognitive_account_id: id.account.to_string(),
        model: props.model.as_ref().map(|m| ModelConfig {
            format: m.format.clone(),
            name: m.name.clone(),
            version: m.version.clone(),
        }),
        sku: payload.sku.as_ref().map(|sku| SkuConfig {
            name: sku.name.clone(),
            tier: sku.tier.clone(),
            size: sku.size.clone(),
            family: sku.family.clone(),
            capacity: sku.capacity.unwrap_or_else(default_capacity),
        }),
        rai_policy_name: props.rai_policy_name.clone(),
        version_upgrade_option: props
            .version_upgrade_option
            .clone()
            .unwrap_or_else(default_upgrade_option),
        dynamic_throttling_enabled: props.dynamic_throttling_enabled.unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

fn deployment_path(id: &DeploymentId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get a deployment.
///
/// # Tracing
///
/// Emits a span named `cognitive::deployments::get` with fields `account`
/// and `deployment`.
#[tracing::instrument(
    name = "cognitive::deployments::get",
    skip(client),
    fields(account = %id.account.account_name, deployment = %id.name)
)]
pub async fn get(client: &ArmClient, id: &DeploymentId) -> ProviderResult<DeploymentPayload> {
    tracing::debug!("getting deployment");

    let response = client.get(&deployment_path(id)).await?;
    let deployment = response.json::<DeploymentPayload>().await?;

    Ok(deployment)
}

/// Create or replace a deployment and wait for it to be provisioned.
///
/// # Tracing
///
/// Emits a span named `cognitive::deployments::create_or_update` with fields
/// `account` and `deployment`.
#[tracing::instrument(
    name = "cognitive::deployments::create_or_update",
    skip(client, deployment),
    fields(account = %id.account.account_name, deployment = %id.name)
)]
pub async fn create_or_update(
    client: &ArmClient,
    id: &DeploymentId,
    deployment: &DeploymentPayload,
) -> ProviderResult<DeploymentPayload> {
    tracing::debug!("writing deployment");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let path = deployment_path(id);
    let response = client.put(&path, deployment).await?;
    lro::wait_for_completion(client, response).await?;
    let body = lro::wait_for_provisioning_state(client, &path).await?;

    tracing::debug!("deployment provisioned");
    Ok(serde_json::from_value(body)?)
}

/// Delete a deployment.
///
/// # Tracing
///
/// Emits a span named `cognitive::deployments::delete` with fields `account`
/// and `deployment`.
#[tracing::instrument(
    name = "cognitive::deployments::delete",
    skip(client),
    fields(account = %id.account.account_name, deployment = %id.name)
)]
pub async fn delete(client: &ArmClient, id: &DeploymentId) -> ProviderResult<()> {
    tracing::debug!("deleting deployment");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&deployment_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("deployment deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Resource adapter
// ---------------------------------------------------------------------------

/// Adapter for `azurerm_cognitive_deployment`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentResource;

#[async_trait]
impl ResourceAdapter for DeploymentResource {
    type Model = Deployment;
    type Id = DeploymentId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &Deployment) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(&self, ctx: &ResourceContext, model: &Deployment) -> ProviderResult<DeploymentId> {
        let account_id: AccountId = model.cognitive_account_id.parse()?;
        let id = DeploymentId::new(account_id, &model.name);
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create_or_update(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &DeploymentId,
        _prior: Option<&Deployment>,
    ) -> ProviderResult<Option<Deployment>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|payload| flatten(id, &payload)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &DeploymentId,
        _prior: &Deployment,
        model: &Deployment,
    ) -> ProviderResult<()> {
        create_or_update(&ctx.client, id, &expand(model)).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &ResourceContext, id: &DeploymentId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account_id, account_path, setup_context, setup_mock_client};
    use azure_cognitive_core::resource::DynResource;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn deployment_id() -> DeploymentId {
        DeploymentId::new(account_id(), "gpt4o")
    }

    fn deployment() -> Deployment {
        Deployment {
            name: "gpt4o".into(),
            cognitive_account_id: account_path(),
            model: Some(ModelConfig {
                format: "OpenAI".into(),
                name: "gpt-4o".into(),
                version: Some("2024-08-06".into()),
            }),
            sku: Some(SkuConfig {
                name: "GlobalStandard".into(),
                tier: None,
                size: None,
                family: None,
                capacity: 10,
            }),
            ..Deployment::default()
        }
    }

    fn deployment_body() -> serde_json::Value {
        serde_json::json!({
            "id": deployment_id().to_string(),
            "name": "gpt4o",
            "sku": {"name": "GlobalStandard", "capacity": 10},
            "properties": {
                "model": {"format": "OpenAI", "name": "gpt-4o", "version": "2024-08-06"},
                "versionUpgradeOption": "OnceNewDefaultVersionAvailable",
                "provisioningState": "Succeeded"
            }
        })
    }

    #[test]
    fn validation() {
        assert!(validate(&deployment()).is_ok());

        let mut model = deployment();
        model.sku.as_mut().unwrap().capacity = 0;
        assert!(validate(&model).is_err());

        let mut model = deployment();
        model.model = None;
        assert!(validate(&model).is_err());

        let mut model = deployment();
        model.version_upgrade_option = "Whenever".into();
        assert!(validate(&model).is_err());

        let mut model = deployment();
        model.sku.as_mut().unwrap().name = "Cheap".into();
        assert!(validate(&model).is_err());
    }

    #[test]
    fn sku_capacity_defaults_to_one() {
        let state: Deployment = serde_json::from_value(serde_json::json!({
            "name": "d",
            "sku": [{"name": "Standard"}]
        }))
        .unwrap();
        assert_eq!(state.sku.unwrap().capacity, 1);
        assert_eq!(state.version_upgrade_option, "OnceNewDefaultVersionAvailable");
    }

    #[test]
    fn expand_and_flatten_agree() {
        let payload = expand(&deployment());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["sku"]["capacity"], 10);
        assert_eq!(json["properties"]["model"]["name"], "gpt-4o");
        assert_eq!(json["properties"]["dynamicThrottlingEnabled"], false);

        let body: DeploymentPayload = serde_json::from_value(deployment_body()).unwrap();
        assert_eq!(flatten(&deployment_id(), &body), deployment());
    }

    #[tokio::test]
    async fn create_checks_existence_then_puts() {
        let server = MockServer::start().await;
        let deployment_path = deployment_id().to_string();

        Mock::given(method("GET"))
            .and(path(deployment_path.as_str()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(deployment_path.as_str()))
            .and(body_partial_json(serde_json::json!({
                "sku": {"name": "GlobalStandard", "capacity": 10},
                "properties": {"model": {"format": "OpenAI"}}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(deployment_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(deployment_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment_body()))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynResource::create(
            &DeploymentResource,
            &ctx,
            serde_json::to_value(deployment()).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(state["id"], deployment_path);
        assert_eq!(state["model"]["version"], "2024-08-06");
    }

    #[tokio::test]
    async fn create_refuses_existing_deployment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(deployment_id().to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(deployment_body()))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let err = ResourceAdapter::create(&DeploymentResource, &ctx, &deployment())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn delete_waits_for_location() {
        let server = MockServer::start().await;
        let location = format!("{}/operationResults/op1", server.uri());

        Mock::given(method("DELETE"))
            .and(path(deployment_id().to_string()))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operationResults/op1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = setup_mock_client(&server).await;
        delete(&client, &deployment_id()).await.unwrap();
    }

    #[tokio::test]
    async fn read_of_missing_deployment_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(deployment_id().to_string()))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = ResourceAdapter::read(&DeploymentResource, &ctx, &deployment_id(), None)
            .await
            .unwrap();
        assert!(state.is_none());
    }
}
