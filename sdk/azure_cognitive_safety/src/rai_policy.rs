//! Content filtering policies (`azurerm_cognitive_account_rai_policy`).
//!
//! A policy starts from a base policy and overrides individual content
//! filters for prompts and completions. Deployments reference policies by
//! name through `rai_policy_name`.

use async_trait::async_trait;
use azure_cognitive_accounts::account;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::{AccountId, RaiPolicyId};
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::models::{tags_attribute, validate_tags, Tags};
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Block, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::models::{ContentFilter, CustomBlocklist, RaiPolicy, RaiPolicyProperties, API_VERSION};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_rai_policy";

pub const MODES: &[&str] = &["Default", "Deferred", "Blocking", "Asynchronous_filter"];

pub const SOURCES: &[&str] = &["Prompt", "Completion"];

pub const SEVERITY_THRESHOLDS: &[&str] = &["Low", "Medium", "High"];

/// Filters graded by severity; each needs a `severity_threshold`.
pub const SEVERITY_FILTERS: &[&str] = &["Hate", "Sexual", "Violence", "SelfHarm"];

/// Declarative state of an RAI policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveRaiPolicy {
    pub name: String,
    pub cognitive_account_id: String,
    pub base_policy_name: String,
    pub mode: Option<String>,
    pub content_filter: Vec<ContentFilterConfig>,
    pub custom_block: Vec<CustomBlockConfig>,
    pub tags: Tags,
}

/// One `content_filter` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFilterConfig {
    pub name: String,
    pub filter_enabled: bool,
    pub block_enabled: bool,
    pub severity_threshold: Option<String>,
    pub source: String,
}

/// One `custom_block` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomBlockConfig {
    pub blocklist_name: String,
    pub block_enabled: bool,
    pub source: String,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("cognitive_account_id", Attribute::required_string().force_new())
        .attribute("base_policy_name", Attribute::required_string().force_new())
        .attribute("mode", Attribute::optional_computed(AttributeType::String))
        .block(
            "content_filter",
            Block::list(
                Schema::new()
                    .attribute("name", Attribute::required_string())
                    .attribute("filter_enabled", Attribute::required(AttributeType::Bool))
                    .attribute("block_enabled", Attribute::required(AttributeType::Bool))
                    .attribute("severity_threshold", Attribute::optional_string())
                    .attribute("source", Attribute::required_string()),
            )
            .min_items(1),
        )
        .block(
            "custom_block",
            Block::set(
                Schema::new()
                    .attribute("blocklist_name", Attribute::required_string())
                    .attribute("block_enabled", Attribute::required(AttributeType::Bool))
                    .attribute("source", Attribute::required_string()),
            ),
        )
        .attribute("tags", tags_attribute())
}

fn validate_content_filter(filter: &ContentFilterConfig) -> ProviderResult<()> {
    validate::not_empty("content_filter.name", &filter.name)?;
    validate::one_of("content_filter.source", &filter.source, SOURCES)?;

    match (&filter.severity_threshold, SEVERITY_FILTERS.contains(&filter.name.as_str())) {
        (Some(threshold), _) => {
            validate::one_of("content_filter.severity_threshold", threshold, SEVERITY_THRESHOLDS)
        }
        (None, true) => Err(ProviderError::Validation(format!(
            "content_filter {:?} ({}) requires a severity_threshold",
            filter.name, filter.source
        ))),
        (None, false) => Ok(()),
    }
}

pub fn validate(model: &CognitiveRaiPolicy) -> ProviderResult<()> {
    validate::rai_name("name", &model.name)?;
    model.cognitive_account_id.parse::<AccountId>()?;
    validate::not_empty("base_policy_name", &model.base_policy_name)?;
    if let Some(mode) = &model.mode {
        validate::one_of("mode", mode, MODES)?;
    }

    if model.content_filter.is_empty() {
        return Err(ProviderError::Validation(
            "at least one `content_filter` block is required".into(),
        ));
    }
    for filter in &model.content_filter {
        validate_content_filter(filter)?;
    }
    for block in &model.custom_block {
        validate::rai_name("custom_block.blocklist_name", &block.blocklist_name)?;
        validate::one_of("custom_block.source", &block.source, SOURCES)?;
    }

    validate_tags(&model.tags)
}

pub fn expand(model: &CognitiveRaiPolicy) -> RaiPolicy {
    let content_filters = model
        .content_filter
        .iter()
        .map(|filter| ContentFilter {
            name: filter.name.clone(),
            enabled: filter.filter_enabled,
            blocking: filter.block_enabled,
            severity_threshold: filter.severity_threshold.clone(),
            source: filter.source.clone(),
        })
        .collect();

    let custom_blocklists = model
        .custom_block
        .iter()
        .map(|block| CustomBlocklist {
            blocklist_name: block.blocklist_name.clone(),
            blocking: block.block_enabled,
            source: block.source.clone(),
        })
        .collect();

    RaiPolicy {
        id: None,
        tags: Some(model.tags.clone()),
        properties: RaiPolicyProperties {
            base_policy_name: Some(model.base_policy_name.clone()),
            mode: model.mode.clone(),
            content_filters,
            custom_blocklists,
            policy_type: None,
        },
    }
}

pub fn flatten(id: &RaiPolicyId, policy: &RaiPolicy) -> CognitiveRaiPolicy {
    let props = &policy.properties;
    CognitiveRaiPolicy {
        name: id.name.clone(),
        cognitive_account_id: id.account.to_string(),
        base_policy_name: props.base_policy_name.clone().unwrap_or_default(),
        mode: props.mode.clone(),
        content_filter: props
            .content_filters
            .iter()
            .map(|filter| ContentFilterConfig {
                name: filter.name.clone(),
                filter_enabled: filter.enabled,
                block_enabled: filter.blocking,
                severity_threshold: filter.severity_threshold.clone(),
                source: filter.source.clone(),
            })
            .collect(),
        custom_block: props
            .custom_blocklists
            .iter()
            .map(|block| CustomBlockConfig {
                blocklist_name: block.blocklist_name.clone(),
                block_enabled: block.blocking,
                source: block.source.clone(),
            })
            .collect(),
        tags: policy.tags.clone().unwrap_or_default(),
    }
}

fn policy_path(id: &RaiPolicyId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get an RAI policy.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_policies::get` with fields `account`
/// and `policy`.
#[tracing::instrument(
    name = "cognitive::rai_policies::get",
    skip(client),
    fields(account = %id.account.account_name, policy = %id.name)
)]
pub async fn get(client: &ArmClient, id: &RaiPolicyId) -> ProviderResult<RaiPolicy> {
    tracing::debug!("getting RAI policy");

    let response = client.get(&policy_path(id)).await?;
    let policy = response.json::<RaiPolicy>().await?;

    Ok(policy)
}

/// Create or replace an RAI policy.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_policies::create_or_update` with fields
/// `account`, `policy`, and `filters`.
#[tracing::instrument(
    name = "cognitive::rai_policies::create_or_update",
    skip(client, policy),
    fields(
        account = %id.account.account_name,
        policy = %id.name,
        filters = policy.properties.content_filters.len()
    )
)]
pub async fn create_or_update(
    client: &ArmClient,
    id: &RaiPolicyId,
    policy: &RaiPolicy,
) -> ProviderResult<()> {
    tracing::debug!("writing RAI policy");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.put(&policy_path(id), policy).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("RAI policy written");
    Ok(())
}

/// Delete an RAI policy.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_policies::delete` with fields `account`
/// and `policy`.
#[tracing::instrument(
    name = "cognitive::rai_policies::delete",
    skip(client),
    fields(account = %id.account.account_name, policy = %id.name)
)]
pub async fn delete(client: &ArmClient, id: &RaiPolicyId) -> ProviderResult<()> {
    tracing::debug!("deleting RAI policy");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&policy_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("RAI policy deleted");
    Ok(())
}

/// Adapter for `azurerm_cognitive_account_rai_policy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiPolicyResource;

#[async_trait]
impl ResourceAdapter for RaiPolicyResource {
    type Model = CognitiveRaiPolicy;
    type Id = RaiPolicyId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CognitiveRaiPolicy) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(&self, ctx: &ResourceContext, model: &CognitiveRaiPolicy) -> ProviderResult<RaiPolicyId> {
        let id = RaiPolicyId::new(model.cognitive_account_id.parse()?, &model.name);
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create_or_update(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &RaiPolicyId,
        _prior: Option<&CognitiveRaiPolicy>,
    ) -> ProviderResult<Option<CognitiveRaiPolicy>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|policy| flatten(id, &policy)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &RaiPolicyId,
        _prior: &CognitiveRaiPolicy,
        model: &CognitiveRaiPolicy,
    ) -> ProviderResult<()> {
        create_or_update(&ctx.client, id, &expand(model)).await
    }

    async fn delete(&self, ctx: &ResourceContext, id: &RaiPolicyId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}
