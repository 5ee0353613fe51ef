//! AI Services accounts (`azurerm_ai_services`).
//!
//! An AI Services account is a Cognitive Services account with `kind` fixed
//! to `AIServices`. It shares the account API calls and network, storage,
//! and encryption helpers with [`crate::account`]; only the state shape
//! differs.

use async_trait::async_trait;
use azure_cognitive_core::error::{ProviderError, ProviderResult};
use azure_cognitive_core::ids::AccountId;
use azure_cognitive_core::models::{
    expand_identity_or_none, flatten_identity, normalize_location, single_block, tags_attribute,
    validate_tags, Identity, SkuPayload, Tags,
};
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::account::{
    self, allow_all_network_rules, customer_managed_key_block, expand_network_acls,
    expand_storage, flatten_customer_managed_key, flatten_network_acls, flatten_storage,
    key_vault_encryption, lock_networks, microsoft_managed_encryption, storage_block,
    validate_customer_managed_key, validate_network_acls, validate_storage, CustomerManagedKey,
    NetworkAcls, Storage,
};
use crate::models::{Account, AccountProperties, ApiKeys};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_ai_services";

/// The account kind this resource manages.
pub const KIND: &str = "AIServices";

const PUBLIC_NETWORK_ACCESS: &[&str] = &["Enabled", "Disabled"];

/// Declarative state of an AI Services account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiServices {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub sku_name: String,
    pub custom_subdomain_name: Option<String>,
    pub fqdns: Vec<String>,
    #[serde(deserialize_with = "single_block")]
    pub identity: Option<Identity>,
    pub local_auth_enabled: bool,
    #[serde(deserialize_with = "single_block")]
    pub network_acls: Option<NetworkAcls>,
    pub outbound_network_access_restricted: bool,
    /// `Enabled` or `Disabled`.
    pub public_network_access: String,
    pub storage: Vec<Storage>,
    #[serde(deserialize_with = "single_block")]
    pub customer_managed_key: Option<CustomerManagedKey>,
    pub tags: Tags,

    pub endpoint: Option<String>,
    pub primary_access_key: Option<String>,
    pub secondary_access_key: Option<String>,
}

impl Default for AiServices {
    fn default() -> Self {
        Self {
            name: String::new(),
            resource_group_name: String::new(),
            location: String::new(),
            sku_name: String::new(),
            custom_subdomain_name: None,
            fqdns: Vec::new(),
            identity: None,
            local_auth_enabled: true,
            network_acls: None,
            outbound_network_access_restricted: false,
            public_network_access: "Enabled".to_string(),
            storage: Vec::new(),
            customer_managed_key: None,
            tags: Tags::new(),
            endpoint: None,
            primary_access_key: None,
            secondary_access_key: None,
        }
    }
}

/// Schema of `azurerm_ai_services`.
pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("resource_group_name", Attribute::required_string().force_new())
        .attribute("location", Attribute::required_string().force_new())
        .attribute("sku_name", Attribute::required_string())
        .attribute("custom_subdomain_name", Attribute::optional_string().force_new())
        .attribute("fqdns", Attribute::string_list())
        .block("identity", Identity::schema_block())
        .attribute("local_auth_enabled", Attribute::optional_bool().default_value(true))
        .block("network_acls", account::network_acls_block(true))
        .attribute(
            "outbound_network_access_restricted",
            Attribute::optional_bool().default_value(false),
        )
        .attribute(
            "public_network_access",
            Attribute::optional(AttributeType::String).default_value("Enabled"),
        )
        .block("storage", storage_block())
        .block("customer_managed_key", customer_managed_key_block())
        .attribute("tags", tags_attribute())
        .attribute("endpoint", Attribute::computed_string())
        .attribute("primary_access_key", Attribute::computed_string().sensitive())
        .attribute("secondary_access_key", Attribute::computed_string().sensitive())
}

pub fn validate(model: &AiServices) -> ProviderResult<()> {
    validate::account_name(&model.name)?;
    validate::resource_group_name(&model.resource_group_name)?;
    validate::not_empty("location", &model.location)?;
    validate::one_of("sku_name", &model.sku_name, account::SKUS)?;
    validate::one_of(
        "public_network_access",
        &model.public_network_access,
        PUBLIC_NETWORK_ACCESS,
    )?;
    validate_tags(&model.tags)?;

    if let Some(subdomain) = &model.custom_subdomain_name {
        validate::custom_subdomain_name(subdomain)?;
    }
    if let Some(identity) = &model.identity {
        identity.validate()?;
    }
    if let Some(acls) = &model.network_acls {
        if model.custom_subdomain_name.is_none() {
            return Err(ProviderError::Validation(
                "the `network_acls` block requires `custom_subdomain_name` to be set".into(),
            ));
        }
        validate_network_acls(acls, true)?;
    }
    validate_storage(&model.storage)?;
    if let Some(key) = &model.customer_managed_key {
        validate_customer_managed_key(key)?;
    }
    Ok(())
}

/// Convert AI Services state into an account request body.
pub fn expand(model: &AiServices) -> ProviderResult<Account> {
    let encryption = model
        .customer_managed_key
        .as_ref()
        .map(|key| key_vault_encryption(&key.key_vault_key_id, key.identity_client_id.as_deref()))
        .transpose()?;

    Ok(Account {
        kind: Some(KIND.to_string()),
        location: Some(normalize_location(&model.location)),
        sku: Some(SkuPayload {
            name: model.sku_name.clone(),
            ..SkuPayload::default()
        }),
        identity: Some(expand_identity_or_none(model.identity.as_ref())),
        tags: Some(model.tags.clone()),
        properties: AccountProperties {
            custom_sub_domain_name: model.custom_subdomain_name.clone(),
            allowed_fqdn_list: Some(model.fqdns.clone()),
            disable_local_auth: Some(!model.local_auth_enabled),
            network_acls: expand_network_acls(model.network_acls.as_ref()),
            public_network_access: Some(model.public_network_access.clone()),
            restrict_outbound_network_access: Some(model.outbound_network_access_restricted),
            user_owned_storage: Some(expand_storage(&model.storage)),
            encryption,
            ..AccountProperties::default()
        },
        ..Account::default()
    })
}

/// Convert a change from `prior` to `model` into a PATCH body, resetting
/// removed network rules and customer-managed keys.
pub fn expand_patch(prior: &AiServices, model: &AiServices) -> ProviderResult<Account> {
    let mut payload = expand(model)?;
    payload.kind = None;
    payload.location = None;

    let props = &mut payload.properties;
    if model.network_acls.is_none() && prior.network_acls.is_some() {
        props.network_acls = Some(allow_all_network_rules());
    }
    if model.customer_managed_key.is_none() && prior.customer_managed_key.is_some() {
        props.encryption = Some(microsoft_managed_encryption());
    }
    Ok(payload)
}

/// Convert an account into AI Services state. Fails for any other kind.
pub fn flatten(id: &AccountId, account: &Account, keys: Option<&ApiKeys>) -> ProviderResult<AiServices> {
    let kind = account.kind.as_deref().unwrap_or_default();
    if !kind.eq_ignore_ascii_case(KIND) {
        return Err(ProviderError::Validation(format!(
            "{id} is a {kind:?} account, expected {KIND:?}"
        )));
    }

    let props = &account.properties;
    Ok(AiServices {
        name: id.account_name.clone(),
        resource_group_name: id.resource_group_name.clone(),
        location: account
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        sku_name: account
            .sku
            .as_ref()
            .map(|sku| sku.name.clone())
            .unwrap_or_default(),
        custom_subdomain_name: props.custom_sub_domain_name.clone(),
        fqdns: props.allowed_fqdn_list.clone().unwrap_or_default(),
        identity: flatten_identity(account.identity.as_ref()),
        local_auth_enabled: !props.disable_local_auth.unwrap_or(false),
        network_acls: flatten_network_acls(props.network_acls.as_ref()),
        outbound_network_access_restricted: props
            .restrict_outbound_network_access
            .unwrap_or_default(),
        public_network_access: props
            .public_network_access
            .clone()
            .unwrap_or_else(|| "Enabled".to_string()),
        storage: flatten_storage(props.user_owned_storage.as_ref()),
        customer_managed_key: flatten_customer_managed_key(props.encryption.as_ref()),
        tags: account.tags.clone().unwrap_or_default(),
        endpoint: props.endpoint.clone(),
        primary_access_key: keys.and_then(|k| k.key1.clone()),
        secondary_access_key: keys.and_then(|k| k.key2.clone()),
    })
}

/// Adapter for `azurerm_ai_services`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AiServicesResource;

#[async_trait]
impl ResourceAdapter for AiServicesResource {
    type Model = AiServices;
    type Id = AccountId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &AiServices) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(&self, ctx: &ResourceContext, model: &AiServices) -> ProviderResult<AccountId> {
        let id = AccountId::new(
            ctx.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );
        ensure_absent(RESOURCE_TYPE, &id, account::get(&ctx.client, &id)).await?;

        let payload = expand(model)?;
        let _locks = lock_networks(model.network_acls.as_ref()).await?;
        account::create(&ctx.client, &id, &payload).await?;

        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &AccountId,
        _prior: Option<&AiServices>,
    ) -> ProviderResult<Option<AiServices>> {
        let Some((current, keys)) = account::get_with_keys(&ctx.client, id).await? else {
            return Ok(None);
        };
        flatten(id, &current, keys.as_ref()).map(Some)
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &AccountId,
        prior: &AiServices,
        model: &AiServices,
    ) -> ProviderResult<()> {
        let payload = expand_patch(prior, model)?;

        let _locks = lock_networks(model.network_acls.as_ref()).await?;
        account::update(&ctx.client, id, &payload).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &ResourceContext, id: &AccountId) -> ProviderResult<()> {
        account::delete_and_maybe_purge(ctx, id).await
    }
}
