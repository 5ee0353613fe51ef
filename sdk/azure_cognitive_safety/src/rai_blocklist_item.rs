//! Blocklist entries (`azurerm_cognitive_account_rai_blocklist_item`).
//!
//! Each item is one literal term or regular expression.

use async_trait::async_trait;
use azure_cognitive_accounts::account;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::{RaiBlocklistId, RaiBlocklistItemId};
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::models::{RaiBlocklistItem, RaiBlocklistItemProperties, API_VERSION};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_rai_blocklist_item";

/// ARM rejects longer patterns.
pub const MAX_PATTERN_LEN: usize = 1000;

/// Declarative state of a blocklist item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveRaiBlocklistItem {
    pub name: String,
    pub rai_blocklist_id: String,
    pub pattern: String,
    pub is_regex: bool,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("rai_blocklist_id", Attribute::required_string().force_new())
        .attribute("pattern", Attribute::required_string())
        .attribute("is_regex", Attribute::optional_bool().default_value(false))
}

pub fn validate(model: &CognitiveRaiBlocklistItem) -> ProviderResult<()> {
    validate::rai_name("name", &model.name)?;
    model.rai_blocklist_id.parse::<RaiBlocklistId>()?;
    validate::not_empty("pattern", &model.pattern)?;
    if model.pattern.chars().count() > MAX_PATTERN_LEN {
        return Err(ProviderError::Validation(format!(
            "pattern must be at most {MAX_PATTERN_LEN} characters"
        )));
    }
    if model.is_regex {
        regex::Regex::new(&model.pattern).map_err(|e| {
            ProviderError::Validation(format!("pattern is not a valid regular expression: {e}"))
        })?;
    }
    Ok(())
}

fn expand(model: &CognitiveRaiBlocklistItem) -> RaiBlocklistItem {
    RaiBlocklistItem {
        id: None,
        properties: RaiBlocklistItemProperties {
            pattern: model.pattern.clone(),
            is_regex: model.is_regex,
        },
    }
}

fn flatten(id: &RaiBlocklistItemId, item: &RaiBlocklistItem) -> CognitiveRaiBlocklistItem {
    CognitiveRaiBlocklistItem {
        name: id.name.clone(),
        rai_blocklist_id: id.blocklist.to_string(),
        pattern: item.properties.pattern.clone(),
        is_regex: item.properties.is_regex,
    }
}

fn item_path(id: &RaiBlocklistItemId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get a blocklist item.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_blocklist_items::get` with fields
/// `blocklist` and `item`.
#[tracing::instrument(
    name = "cognitive::rai_blocklist_items::get",
    skip(client),
    fields(blocklist = %id.blocklist.name, item = %id.name)
)]
pub async fn get(client: &ArmClient, id: &RaiBlocklistItemId) -> ProviderResult<RaiBlocklistItem> {
    tracing::debug!("getting RAI blocklist item");

    let response = client.get(&item_path(id)).await?;
    let item = response.json::<RaiBlocklistItem>().await?;

    Ok(item)
}

/// Create or replace a blocklist item.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_blocklist_items::create_or_update`
/// with fields `blocklist`, `item`, and `is_regex`.
#[tracing::instrument(
    name = "cognitive::rai_blocklist_items::create_or_update",
    skip(client, item),
    fields(blocklist = %id.blocklist.name, item = %id.name, is_regex = item.properties.is_regex)
)]
pub async fn create_or_update(
    client: &ArmClient,
    id: &RaiBlocklistItemId,
    item: &RaiBlocklistItem,
) -> ProviderResult<()> {
    tracing::debug!("writing RAI blocklist item");

    let account_name = &id.blocklist.account.account_name;
    let _lock = locks::lock_by_name(account_name, account::RESOURCE_TYPE).await;
    let response = client.put(&item_path(id), item).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("RAI blocklist item written");
    Ok(())
}

/// Delete a blocklist item.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_blocklist_items::delete` with fields
/// `blocklist` and `item`.
#[tracing::instrument(
    name = "cognitive::rai_blocklist_items::delete",
    skip(client),
    fields(blocklist = %id.blocklist.name, item = %id.name)
)]
pub async fn delete(client: &ArmClient, id: &RaiBlocklistItemId) -> ProviderResult<()> {
    tracing::debug!("deleting RAI blocklist item");

    let account_name = &id.blocklist.account.account_name;
    let _lock = locks::lock_by_name(account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&item_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("RAI blocklist item deleted");
    Ok(())
}

/// Adapter for `azurerm_cognitive_account_rai_blocklist_item`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiBlocklistItemResource;

#[async_trait]
impl ResourceAdapter for RaiBlocklistItemResource {
    type Model = CognitiveRaiBlocklistItem;
    type Id = RaiBlocklistItemId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CognitiveRaiBlocklistItem) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        model: &CognitiveRaiBlocklistItem,
    ) -> ProviderResult<RaiBlocklistItemId> {
        let id = RaiBlocklistItemId::new(model.rai_blocklist_id.parse()?, &model.name);
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create_or_update(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &RaiBlocklistItemId,
        _prior: Option<&CognitiveRaiBlocklistItem>,
    ) -> ProviderResult<Option<CognitiveRaiBlocklistItem>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|item| flatten(id, &item)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &RaiBlocklistItemId,
        _prior: &CognitiveRaiBlocklistItem,
        model: &CognitiveRaiBlocklistItem,
    ) -> ProviderResult<()> {
        create_or_update(&ctx.client, id, &expand(model)).await
    }

    async fn delete(&self, ctx: &ResourceContext, id: &RaiBlocklistItemId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{blocklist_id, setup_context};
    use azure_cognitive_core::resource::DynResource;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item_id() -> RaiBlocklistItemId {
        RaiBlocklistItemId::new(blocklist_id(), "darn")
    }

    fn item() -> CognitiveRaiBlocklistItem {
        CognitiveRaiBlocklistItem {
            name: "darn".into(),
            rai_blocklist_id: blocklist_id().to_string(),
            pattern: "d[a4]rn".into(),
            is_regex: true,
        }
    }

    #[test]
    fn validation() {
        assert!(validate(&item()).is_ok());

        let mut model = item();
        model.pattern = "d[a4rn".into();
        assert!(validate(&model).is_err());
        model.is_regex = false;
        assert!(validate(&model).is_ok());

        let mut model = item();
        model.pattern = "x".repeat(MAX_PATTERN_LEN + 1);
        model.is_regex = false;
        assert!(validate(&model).is_err());

        let mut model = item();
        model.rai_blocklist_id = account_blocklist_parent();
        assert!(validate(&model).is_err());
    }

    fn account_blocklist_parent() -> String {
        blocklist_id().account.to_string()
    }

    #[tokio::test]
    async fn create_puts_pattern() {
        let server = MockServer::start().await;
        let item_path = item_id().to_string();
        let body = serde_json::json!({
            "id": item_path,
            "properties": {"pattern": "d[a4]rn", "isRegex": true}
        });

        Mock::given(method("GET"))
            .and(path(item_path.as_str()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(item_path.as_str()))
            .and(body_partial_json(serde_json::json!({
                "properties": {"pattern": "d[a4]rn", "isRegex": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(item_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynResource::create(
            &RaiBlocklistItemResource,
            &ctx,
            serde_json::to_value(item()).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(state["id"], item_path);
        assert_eq!(state["rai_blocklist_id"], blocklist_id().to_string());
        assert_eq!(state["is_regex"], true);
    }

    #[tokio::test]
    async fn delete_sends_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(item_id().to_string()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        ResourceAdapter::delete(&RaiBlocklistItemResource, &ctx, &item_id())
            .await
            .unwrap();
    }
}
