//! Customer-managed keys (`azurerm_cognitive_account_customer_managed_key`).
//!
//! Not a separate ARM object: the resource owns the `encryption` property of
//! its parent account and is tracked by the account's ID. Writes patch the
//! account under the account's named lock.

use async_trait::async_trait;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::AccountId;
use azure_cognitive_core::locks;
use azure_cognitive_core::resource::{ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, Schema};
use serde::{Deserialize, Serialize};

use crate::account::{
    self, key_vault_encryption, key_vault_key_id, microsoft_managed_encryption,
};
use crate::models::{Account, AccountProperties, Encryption};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_customer_managed_key";

/// Declarative state of a customer-managed key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerManagedKey {
    pub cognitive_account_id: String,
    pub key_vault_key_id: String,
    pub identity_client_id: Option<String>,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("cognitive_account_id", Attribute::required_string().force_new())
        .attribute("key_vault_key_id", Attribute::required_string())
        .attribute("identity_client_id", Attribute::optional_string())
}

fn encryption_patch(encryption: Encryption) -> Account {
    Account {
        properties: AccountProperties {
            encryption: Some(encryption),
            ..AccountProperties::default()
        },
        ..Account::default()
    }
}

/// Set the account's encryption settings.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::set_encryption` with fields
/// `account` and `key_source`.
#[tracing::instrument(
    name = "cognitive::accounts::set_encryption",
    skip(client, encryption),
    fields(account = %id.account_name, key_source = %encryption.key_source)
)]
pub async fn set_encryption(
    client: &ArmClient,
    id: &AccountId,
    encryption: Encryption,
) -> ProviderResult<()> {
    tracing::debug!("updating account encryption");

    let _lock = locks::lock_by_name(&id.account_name, account::RESOURCE_TYPE).await;
    account::update(client, id, &encryption_patch(encryption)).await?;

    tracing::debug!("account encryption updated");
    Ok(())
}

fn flatten(id: &AccountId, account: &Account) -> Option<CustomerManagedKey> {
    let encryption = account
        .properties
        .encryption
        .as_ref()
        .filter(|e| e.is_key_vault())?;
    let properties = encryption.key_vault_properties.as_ref()?;

    Some(CustomerManagedKey {
        cognitive_account_id: id.to_string(),
        key_vault_key_id: key_vault_key_id(properties),
        identity_client_id: properties
            .identity_client_id
            .clone()
            .filter(|client_id| !client_id.is_empty()),
    })
}

/// Adapter for `azurerm_cognitive_account_customer_managed_key`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerManagedKeyResource;

#[async_trait]
impl ResourceAdapter for CustomerManagedKeyResource {
    type Model = CustomerManagedKey;
    type Id = AccountId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CustomerManagedKey) -> ProviderResult<()> {
        model.cognitive_account_id.parse::<AccountId>()?;
        key_vault_encryption(&model.key_vault_key_id, None)?;
        Ok(())
    }

    async fn create(&self, ctx: &ResourceContext, model: &CustomerManagedKey) -> ProviderResult<AccountId> {
        let id: AccountId = model.cognitive_account_id.parse()?;
        let encryption =
            key_vault_encryption(&model.key_vault_key_id, model.identity_client_id.as_deref())?;

        let existing = account::get(&ctx.client, &id).await?;
        if existing
            .properties
            .encryption
            .as_ref()
            .is_some_and(Encryption::is_key_vault)
        {
            return Err(ProviderError::AlreadyExists {
                resource_type: RESOURCE_TYPE.to_string(),
                id: id.to_string(),
            });
        }

        set_encryption(&ctx.client, &id, encryption).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &AccountId,
        _prior: Option<&CustomerManagedKey>,
    ) -> ProviderResult<Option<CustomerManagedKey>> {
        let Some(current) = not_found_to_none(account::get(&ctx.client, id).await)? else {
            return Ok(None);
        };
        Ok(flatten(id, &current))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &AccountId,
        _prior: &CustomerManagedKey,
        model: &CustomerManagedKey,
    ) -> ProviderResult<()> {
        let encryption =
            key_vault_encryption(&model.key_vault_key_id, model.identity_client_id.as_deref())?;
        set_encryption(&ctx.client, id, encryption).await
    }

    async fn delete(&self, ctx: &ResourceContext, id: &AccountId) -> ProviderResult<()> {
        if not_found_to_none(account::get(&ctx.client, id).await)?.is_none() {
            tracing::debug!(account = %id.account_name, "account is gone, no encryption to reset");
            return Ok(());
        }
        set_encryption(&ctx.client, id, microsoft_managed_encryption()).await
    }
}
