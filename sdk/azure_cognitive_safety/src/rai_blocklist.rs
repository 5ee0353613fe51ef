//! Custom blocklists (`azurerm_cognitive_account_rai_blocklist`).

use async_trait::async_trait;
use azure_cognitive_accounts::account;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderResult};
use azure_cognitive_core::ids::{AccountId, RaiBlocklistId};
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::models::{RaiBlocklist, RaiBlocklistProperties, API_VERSION};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_rai_blocklist";

/// Declarative state of a blocklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveRaiBlocklist {
    pub name: String,
    pub cognitive_account_id: String,
    pub description: Option<String>,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("cognitive_account_id", Attribute::required_string().force_new())
        .attribute("description", Attribute::optional_string())
}

pub fn validate(model: &CognitiveRaiBlocklist) -> ProviderResult<()> {
    validate::rai_name("name", &model.name)?;
    model.cognitive_account_id.parse::<AccountId>()?;
    Ok(())
}

fn expand(model: &CognitiveRaiBlocklist) -> RaiBlocklist {
    RaiBlocklist {
        id: None,
        properties: RaiBlocklistProperties {
            description: model.description.clone(),
        },
    }
}

fn flatten(id: &RaiBlocklistId, blocklist: &RaiBlocklist) -> CognitiveRaiBlocklist {
    CognitiveRaiBlocklist {
        name: id.name.clone(),
        cognitive_account_id: id.account.to_string(),
        description: blocklist
            .properties
            .description
            .clone()
            .filter(|d| !d.is_empty()),
    }
}

fn blocklist_path(id: &RaiBlocklistId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get a blocklist.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_blocklists::get` with fields `account`
/// and `blocklist`.
#[tracing::instrument(
    name = "cognitive::rai_blocklists::get",
    skip(client),
    fields(account = %id.account.account_name, blocklist = %id.name)
)]
pub async fn get(client: &ArmClient, id: &RaiBlocklistId) -> ProviderResult<RaiBlocklist> {
    tracing::debug!("getting RAI blocklist");

    let response = client.get(&blocklist_path(id)).await?;
    let blocklist = response.json::<RaiBlocklist>().await?;

    Ok(blocklist)
}

/// Create or replace a blocklist.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_blocklists::create_or_update` with
/// fields `account` and `blocklist`.
#[tracing::instrument(
    name = "cognitive::rai_blocklists::create_or_update",
    skip(client, blocklist),
    fields(account = %id.account.account_name, blocklist = %id.name)
)]
pub async fn create_or_update(
    client: &ArmClient,
    id: &RaiBlocklistId,
    blocklist: &RaiBlocklist,
) -> ProviderResult<()> {
    tracing::debug!("writing RAI blocklist");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.put(&blocklist_path(id), blocklist).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("RAI blocklist written");
    Ok(())
}

/// Delete a blocklist and every item in it.
///
/// # Tracing
///
/// Emits a span named `cognitive::rai_blocklists::delete` with fields
/// `account` and `blocklist`.
#[tracing::instrument(
    name = "cognitive::rai_blocklists::delete",
    skip(client),
    fields(account = %id.account.account_name, blocklist = %id.name)
)]
pub async fn delete(client: &ArmClient, id: &RaiBlocklistId) -> ProviderResult<()> {
    tracing::debug!("deleting RAI blocklist");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&blocklist_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("RAI blocklist deleted");
    Ok(())
}

/// Adapter for `azurerm_cognitive_account_rai_blocklist`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiBlocklistResource;

#[async_trait]
impl ResourceAdapter for RaiBlocklistResource {
    type Model = CognitiveRaiBlocklist;
    type Id = RaiBlocklistId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CognitiveRaiBlocklist) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        model: &CognitiveRaiBlocklist,
    ) -> ProviderResult<RaiBlocklistId> {
        let id = RaiBlocklistId::new(model.cognitive_account_id.parse()?, &model.name);
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create_or_update(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &RaiBlocklistId,
        _prior: Option<&CognitiveRaiBlocklist>,
    ) -> ProviderResult<Option<CognitiveRaiBlocklist>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|blocklist| flatten(id, &blocklist)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &RaiBlocklistId,
        _prior: &CognitiveRaiBlocklist,
        model: &CognitiveRaiBlocklist,
    ) -> ProviderResult<()> {
        create_or_update(&ctx.client, id, &expand(model)).await
    }

    async fn delete(&self, ctx: &ResourceContext, id: &RaiBlocklistId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}
