//! Cognitive Services accounts (`azurerm_cognitive_account`).
//!
//! An account is the top-level `Microsoft.CognitiveServices/accounts`
//! resource every other entity in this workspace hangs off. Besides the
//! plain CRUD calls this module owns the network, storage, and encryption
//! expand/flatten helpers that [`crate::ai_services`] reuses.
//!
//! # Example
//!
//! ```rust,no_run
//! # use azure_cognitive_core::client::ArmClient;
//! # use azure_cognitive_core::ids::AccountId;
//! # use azure_cognitive_accounts::account;
//! # async fn example(client: &ArmClient) -> azure_cognitive_core::ProviderResult<()> {
//! let id: AccountId =
//!     "/subscriptions/0000/resourceGroups/rg/providers/Microsoft.CognitiveServices/accounts/contoso"
//!         .parse()?;
//!
//! let current = account::get(client, &id).await?;
//! println!("endpoint: {:?}", current.properties.endpoint);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::{AccountId, KeyVaultKeyId, SubnetId, COGNITIVE_NAMESPACE};
use azure_cognitive_core::locks::{self, NamedLockGuard};
use azure_cognitive_core::lro;
use azure_cognitive_core::models::{
    cleared, expand_identity_or_none, flatten_identity, normalize_location, single_block,
    tags_attribute, validate_tags, Identity, SkuPayload, Tags,
};
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Block, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::models::{
    Account, AccountProperties, ApiKeys, ApiProperties, Encryption, IpRule, KeyVaultProperties,
    NetworkRuleSet, UserOwnedStorage, VirtualNetworkRule, API_VERSION, KEY_SOURCE_KEY_VAULT,
    KEY_SOURCE_MICROSOFT,
};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account";

/// Lock namespace for virtual networks referenced by network rules.
pub const VIRTUAL_NETWORK_LOCK: &str = "azurerm_virtual_network";

/// Lock namespace for subnets referenced by network rules.
pub const SUBNET_LOCK: &str = "azurerm_subnet";

/// Account kinds ARM accepts.
pub const KINDS: &[&str] = &[
    "Academic",
    "AIServices",
    "AnomalyDetector",
    "Bing.Autosuggest",
    "Bing.Autosuggest.v7",
    "Bing.CustomSearch",
    "Bing.Search",
    "Bing.Search.v7",
    "Bing.Speech",
    "Bing.SpellCheck",
    "Bing.SpellCheck.v7",
    "CognitiveServices",
    "ComputerVision",
    "ContentModerator",
    "ContentSafety",
    "CustomSpeech",
    "CustomVision.Prediction",
    "CustomVision.Training",
    "Emotion",
    "Face",
    "FormRecognizer",
    "ImmersiveReader",
    "LUIS",
    "LUIS.Authoring",
    "MetricsAdvisor",
    "OpenAI",
    "Personalizer",
    "QnAMaker",
    "Recommendations",
    "SpeakerRecognition",
    "Speech",
    "SpeechServices",
    "SpeechTranslation",
    "TextAnalytics",
    "TextTranslation",
    "WebLM",
];

/// SKU names ARM accepts for accounts.
pub const SKUS: &[&str] = &[
    "C2", "C3", "C4", "D3", "DC0", "E0", "F0", "F1", "P0", "P1", "P2", "S", "S0", "S1", "S2",
    "S3", "S4", "S5", "S6",
];

const NETWORK_DEFAULT_ACTIONS: &[&str] = &["Allow", "Deny"];
const NETWORK_BYPASS: &[&str] = &["None", "AzureServices"];

// ---------------------------------------------------------------------------
// State model
// ---------------------------------------------------------------------------

/// Declarative state of a Cognitive Services account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveAccount {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub kind: String,
    pub sku_name: String,
    pub custom_subdomain_name: Option<String>,
    pub dynamic_throttling_enabled: bool,
    pub fqdns: Vec<String>,
    #[serde(deserialize_with = "single_block")]
    pub identity: Option<Identity>,
    pub local_auth_enabled: bool,
    pub metrics_advisor_aad_client_id: Option<String>,
    pub metrics_advisor_aad_tenant_id: Option<String>,
    pub metrics_advisor_super_user_name: Option<String>,
    pub metrics_advisor_website_name: Option<String>,
    #[serde(deserialize_with = "single_block")]
    pub network_acls: Option<NetworkAcls>,
    pub outbound_network_access_restricted: bool,
    pub project_management_enabled: bool,
    pub public_network_access_enabled: bool,
    pub qna_runtime_endpoint: Option<String>,
    pub custom_question_answering_search_service_id: Option<String>,
    /// Write-only: ARM never returns it.
    pub custom_question_answering_search_service_key: Option<String>,
    pub storage: Vec<Storage>,
    #[serde(deserialize_with = "single_block")]
    pub customer_managed_key: Option<CustomerManagedKey>,
    pub tags: Tags,

    pub endpoint: Option<String>,
    pub primary_access_key: Option<String>,
    pub secondary_access_key: Option<String>,
}

impl Default for CognitiveAccount {
    fn default() -> Self {
        Self {
            name: String::new(),
            resource_group_name: String::new(),
            location: String::new(),
            kind: String::new(),
            sku_name: String::new(),
            custom_subdomain_name: None,
            dynamic_throttling_enabled: false,
            fqdns: Vec::new(),
            identity: None,
            local_auth_enabled: true,
            metrics_advisor_aad_client_id: None,
            metrics_advisor_aad_tenant_id: None,
            metrics_advisor_super_user_name: None,
            metrics_advisor_website_name: None,
            network_acls: None,
            outbound_network_access_restricted: false,
            project_management_enabled: false,
            public_network_access_enabled: true,
            qna_runtime_endpoint: None,
            custom_question_answering_search_service_id: None,
            custom_question_answering_search_service_key: None,
            storage: Vec::new(),
            customer_managed_key: None,
            tags: Tags::new(),
            endpoint: None,
            primary_access_key: None,
            secondary_access_key: None,
        }
    }
}

/// `network_acls` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkAcls {
    pub default_action: String,
    pub bypass: Option<String>,
    pub ip_rules: Vec<String>,
    pub virtual_network_rules: Vec<VirtualNetworkRuleConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualNetworkRuleConfig {
    pub subnet_id: String,
    pub ignore_missing_vnet_service_endpoint: bool,
}

/// `storage` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub storage_account_id: String,
    pub identity_client_id: Option<String>,
}

/// `customer_managed_key` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerManagedKey {
    pub key_vault_key_id: String,
    pub identity_client_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

pub(crate) fn network_acls_block(with_bypass: bool) -> Block {
    let mut schema = Schema::new()
        .attribute("default_action", Attribute::required_string())
        .attribute("ip_rules", Attribute::string_set());
    if with_bypass {
        schema = schema.attribute(
            "bypass",
            Attribute::optional(AttributeType::String).default_value("AzureServices"),
        );
    }
    let schema = schema.block(
        "virtual_network_rules",
        Block::set(
            Schema::new()
                .attribute("subnet_id", Attribute::required_string())
                .attribute(
                    "ignore_missing_vnet_service_endpoint",
                    Attribute::optional_bool().default_value(false),
                ),
        ),
    );
    Block::single(false, schema)
}

pub(crate) fn storage_block() -> Block {
    Block::list(
        Schema::new()
            .attribute("storage_account_id", Attribute::required_string())
            .attribute("identity_client_id", Attribute::optional_string()),
    )
}

pub(crate) fn customer_managed_key_block() -> Block {
    Block::single(
        false,
        Schema::new()
            .attribute("key_vault_key_id", Attribute::required_string())
            .attribute("identity_client_id", Attribute::optional_string()),
    )
}

/// Schema of `azurerm_cognitive_account`.
pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("resource_group_name", Attribute::required_string().force_new())
        .attribute("location", Attribute::required_string().force_new())
        .attribute("kind", Attribute::required_string().force_new())
        .attribute("sku_name", Attribute::required_string())
        .attribute("custom_subdomain_name", Attribute::optional_string().force_new())
        .attribute(
            "dynamic_throttling_enabled",
            Attribute::optional_bool().default_value(false),
        )
        .attribute("fqdns", Attribute::string_list())
        .block("identity", Identity::schema_block())
        .attribute("local_auth_enabled", Attribute::optional_bool().default_value(true))
        .attribute("metrics_advisor_aad_client_id", Attribute::optional_string().force_new())
        .attribute("metrics_advisor_aad_tenant_id", Attribute::optional_string().force_new())
        .attribute("metrics_advisor_super_user_name", Attribute::optional_string().force_new())
        .attribute("metrics_advisor_website_name", Attribute::optional_string().force_new())
        .block("network_acls", network_acls_block(true))
        .attribute(
            "outbound_network_access_restricted",
            Attribute::optional_bool().default_value(false),
        )
        .attribute(
            "project_management_enabled",
            Attribute::optional_bool().default_value(false),
        )
        .attribute(
            "public_network_access_enabled",
            Attribute::optional_bool().default_value(true),
        )
        .attribute("qna_runtime_endpoint", Attribute::optional_string())
        .attribute(
            "custom_question_answering_search_service_id",
            Attribute::optional_string(),
        )
        .attribute(
            "custom_question_answering_search_service_key",
            Attribute::optional_string().sensitive(),
        )
        .block("storage", storage_block())
        .block("customer_managed_key", customer_managed_key_block())
        .attribute("tags", tags_attribute())
        .attribute("endpoint", Attribute::computed_string())
        .attribute("primary_access_key", Attribute::computed_string().sensitive())
        .attribute("secondary_access_key", Attribute::computed_string().sensitive())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_network_acls(acls: &NetworkAcls, with_bypass: bool) -> ProviderResult<()> {
    validate::one_of(
        "network_acls.default_action",
        &acls.default_action,
        NETWORK_DEFAULT_ACTIONS,
    )?;
    if let Some(bypass) = &acls.bypass {
        if !with_bypass {
            return Err(ProviderError::Validation(
                "network_acls.bypass is not supported for this resource".into(),
            ));
        }
        validate::one_of("network_acls.bypass", bypass, NETWORK_BYPASS)?;
    }
    for rule in &acls.ip_rules {
        validate::not_empty("network_acls.ip_rules", rule)?;
    }
    for rule in &acls.virtual_network_rules {
        rule.subnet_id.parse::<SubnetId>()?;
    }
    Ok(())
}

pub(crate) fn validate_storage(storage: &[Storage]) -> ProviderResult<()> {
    for entry in storage {
        validate::not_empty("storage.storage_account_id", &entry.storage_account_id)?;
    }
    Ok(())
}

pub(crate) fn validate_customer_managed_key(key: &CustomerManagedKey) -> ProviderResult<()> {
    key.key_vault_key_id.parse::<KeyVaultKeyId>()?;
    Ok(())
}

/// Argument and cross-field checks for an account.
pub fn validate(model: &CognitiveAccount) -> ProviderResult<()> {
    validate::account_name(&model.name)?;
    validate::resource_group_name(&model.resource_group_name)?;
    validate::not_empty("location", &model.location)?;
    validate::one_of("kind", &model.kind, KINDS)?;
    validate::one_of("sku_name", &model.sku_name, SKUS)?;
    validate_tags(&model.tags)?;

    if let Some(subdomain) = &model.custom_subdomain_name {
        validate::custom_subdomain_name(subdomain)?;
    }
    for fqdn in &model.fqdns {
        validate::not_empty("fqdns", fqdn)?;
    }
    if let Some(identity) = &model.identity {
        identity.validate()?;
    }

    match (model.kind.as_str(), &model.qna_runtime_endpoint) {
        ("QnAMaker", None) => {
            return Err(ProviderError::Validation(
                "the QnAMaker account kind requires the `qna_runtime_endpoint` field to be set"
                    .into(),
            ))
        }
        ("QnAMaker", Some(endpoint)) => validate::url("qna_runtime_endpoint", endpoint)?,
        (_, Some(_)) => {
            return Err(ProviderError::Validation(
                "`qna_runtime_endpoint` can only be set when `kind` is `QnAMaker`".into(),
            ))
        }
        (_, None) => {}
    }

    let metrics_advisor_set = model.metrics_advisor_aad_client_id.is_some()
        || model.metrics_advisor_aad_tenant_id.is_some()
        || model.metrics_advisor_super_user_name.is_some()
        || model.metrics_advisor_website_name.is_some();
    if metrics_advisor_set && model.kind != "MetricsAdvisor" {
        return Err(ProviderError::Validation(
            "the `metrics_advisor_*` fields can only be set when `kind` is `MetricsAdvisor`"
                .into(),
        ));
    }

    let search_service_set = model.custom_question_answering_search_service_id.is_some()
        || model.custom_question_answering_search_service_key.is_some();
    if search_service_set && model.kind != "TextAnalytics" {
        return Err(ProviderError::Validation(
            "the `custom_question_answering_search_service_*` fields can only be set when `kind` \
             is `TextAnalytics`"
                .into(),
        ));
    }
    if model.custom_question_answering_search_service_key.is_some()
        && model.custom_question_answering_search_service_id.is_none()
    {
        return Err(ProviderError::Validation(
            "`custom_question_answering_search_service_key` requires \
             `custom_question_answering_search_service_id`"
                .into(),
        ));
    }

    if let Some(acls) = &model.network_acls {
        if model.custom_subdomain_name.is_none() {
            return Err(ProviderError::Validation(
                "the `network_acls` block requires `custom_subdomain_name` to be set".into(),
            ));
        }
        validate_network_acls(acls, true)?;
    }

    if model.project_management_enabled {
        if model.kind != "AIServices" {
            return Err(ProviderError::Validation(
                "`project_management_enabled` can only be set when `kind` is `AIServices`".into(),
            ));
        }
        if model.identity.is_none() {
            return Err(ProviderError::Validation(
                "`project_management_enabled` requires an `identity` block".into(),
            ));
        }
    }

    validate_storage(&model.storage)?;
    if let Some(key) = &model.customer_managed_key {
        validate_customer_managed_key(key)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Expand / flatten
// ---------------------------------------------------------------------------

pub(crate) fn expand_network_acls(acls: Option<&NetworkAcls>) -> Option<NetworkRuleSet> {
    let acls = acls?;
    Some(NetworkRuleSet {
        default_action: acls.default_action.clone(),
        ip_rules: acls
            .ip_rules
            .iter()
            .map(|value| IpRule {
                value: value.clone(),
            })
            .collect(),
        virtual_network_rules: acls
            .virtual_network_rules
            .iter()
            .map(|rule| VirtualNetworkRule {
                id: rule.subnet_id.clone(),
                ignore_missing_vnet_service_endpoint: rule.ignore_missing_vnet_service_endpoint,
            })
            .collect(),
        bypass: acls.bypass.clone(),
    })
}

pub(crate) fn flatten_network_acls(rules: Option<&NetworkRuleSet>) -> Option<NetworkAcls> {
    let rules = rules?;
    Some(NetworkAcls {
        default_action: rules.default_action.clone(),
        bypass: rules.bypass.clone(),
        ip_rules: rules
            .ip_rules
            .iter()
            .map(|rule| {
                rule.value
                    .strip_suffix("/32")
                    .unwrap_or(&rule.value)
                    .to_string()
            })
            .collect(),
        virtual_network_rules: rules
            .virtual_network_rules
            .iter()
            .map(|rule| VirtualNetworkRuleConfig {
                subnet_id: rule.id.clone(),
                ignore_missing_vnet_service_endpoint: rule.ignore_missing_vnet_service_endpoint,
            })
            .collect(),
    })
}

pub(crate) fn expand_storage(storage: &[Storage]) -> Vec<UserOwnedStorage> {
    storage
        .iter()
        .map(|entry| UserOwnedStorage {
            resource_id: entry.storage_account_id.clone(),
            identity_client_id: entry.identity_client_id.clone(),
        })
        .collect()
}

pub(crate) fn flatten_storage(storage: Option<&Vec<UserOwnedStorage>>) -> Vec<Storage> {
    storage
        .map(|entries| {
            entries
                .iter()
                .map(|entry| Storage {
                    storage_account_id: entry.resource_id.clone(),
                    identity_client_id: entry.identity_client_id.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build the Key Vault encryption settings for `key_vault_key_id`.
pub fn key_vault_encryption(
    key_vault_key_id: &str,
    identity_client_id: Option<&str>,
) -> ProviderResult<Encryption> {
    let key: KeyVaultKeyId = key_vault_key_id.parse()?;
    Ok(Encryption {
        key_source: KEY_SOURCE_KEY_VAULT.to_string(),
        key_vault_properties: Some(KeyVaultProperties {
            key_name: key.name,
            key_version: key.version.unwrap_or_default(),
            key_vault_uri: key.key_vault_base_url,
            identity_client_id: identity_client_id.map(str::to_string),
        }),
    })
}

/// Rebuild the Key Vault key ID from Key Vault encryption settings.
pub fn key_vault_key_id(properties: &KeyVaultProperties) -> String {
    let key_vault_base_url = if properties.key_vault_uri.ends_with('/') {
        properties.key_vault_uri.clone()
    } else {
        format!("{}/", properties.key_vault_uri)
    };
    KeyVaultKeyId {
        key_vault_base_url,
        name: properties.key_name.clone(),
        version: Some(properties.key_version.clone()).filter(|v| !v.is_empty()),
    }
    .to_string()
}

pub(crate) fn flatten_customer_managed_key(
    encryption: Option<&Encryption>,
) -> Option<CustomerManagedKey> {
    let encryption = encryption.filter(|e| e.is_key_vault())?;
    let properties = encryption.key_vault_properties.as_ref()?;
    Some(CustomerManagedKey {
        key_vault_key_id: key_vault_key_id(properties),
        identity_client_id: properties
            .identity_client_id
            .clone()
            .filter(|id| !id.is_empty()),
    })
}

/// Rules that open the account again once `network_acls` is removed.
pub(crate) fn allow_all_network_rules() -> NetworkRuleSet {
    NetworkRuleSet {
        default_action: "Allow".to_string(),
        ip_rules: Vec::new(),
        virtual_network_rules: Vec::new(),
        bypass: None,
    }
}

/// Encryption with service-managed keys.
pub(crate) fn microsoft_managed_encryption() -> Encryption {
    Encryption {
        key_source: KEY_SOURCE_MICROSOFT.to_string(),
        key_vault_properties: None,
    }
}

pub(crate) fn public_network_access(enabled: bool) -> String {
    let access = if enabled { "Enabled" } else { "Disabled" };
    access.to_string()
}

/// Convert account state into the ARM request body.
pub fn expand(model: &CognitiveAccount) -> ProviderResult<Account> {
    let api_properties = expand_api_properties(model);

    let encryption = model
        .customer_managed_key
        .as_ref()
        .map(|key| key_vault_encryption(&key.key_vault_key_id, key.identity_client_id.as_deref()))
        .transpose()?;

    Ok(Account {
        kind: Some(model.kind.clone()),
        location: Some(normalize_location(&model.location)),
        sku: Some(SkuPayload {
            name: model.sku_name.clone(),
            ..SkuPayload::default()
        }),
        identity: Some(expand_identity_or_none(model.identity.as_ref())),
        tags: Some(model.tags.clone()),
        properties: AccountProperties {
            custom_sub_domain_name: model.custom_subdomain_name.clone(),
            dynamic_throttling_enabled: Some(model.dynamic_throttling_enabled),
            allowed_fqdn_list: Some(model.fqdns.clone()),
            disable_local_auth: Some(!model.local_auth_enabled),
            network_acls: expand_network_acls(model.network_acls.as_ref()),
            public_network_access: Some(public_network_access(
                model.public_network_access_enabled,
            )),
            restrict_outbound_network_access: Some(model.outbound_network_access_restricted),
            user_owned_storage: Some(expand_storage(&model.storage)),
            encryption,
            api_properties: (!api_properties.is_empty()).then_some(api_properties),
            allow_project_management: (model.kind == "AIServices")
                .then_some(model.project_management_enabled),
            ..AccountProperties::default()
        },
        ..Account::default()
    })
}

fn expand_api_properties(model: &CognitiveAccount) -> ApiProperties {
    ApiProperties {
        qna_runtime_endpoint: model.qna_runtime_endpoint.clone(),
        qna_azure_search_endpoint_id: model.custom_question_answering_search_service_id.clone(),
        qna_azure_search_endpoint_key: model.custom_question_answering_search_service_key.clone(),
        aad_client_id: model.metrics_advisor_aad_client_id.clone(),
        aad_tenant_id: model.metrics_advisor_aad_tenant_id.clone(),
        super_user: model.metrics_advisor_super_user_name.clone(),
        website_name: model.metrics_advisor_website_name.clone(),
    }
}

/// Convert a change from `prior` to `model` into a PATCH body.
///
/// `kind` and `location` are immutable and left out. ARM keeps whatever a
/// PATCH omits, so blocks and fields set in `prior` but removed from `model`
/// are sent with their reset values.
pub fn expand_patch(prior: &CognitiveAccount, model: &CognitiveAccount) -> ProviderResult<Account> {
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

    let current = expand_api_properties(model);
    let previous = expand_api_properties(prior);
    let api_properties = ApiProperties {
        qna_runtime_endpoint: cleared(current.qna_runtime_endpoint, &previous.qna_runtime_endpoint),
        qna_azure_search_endpoint_id: cleared(
            current.qna_azure_search_endpoint_id,
            &previous.qna_azure_search_endpoint_id,
        ),
        qna_azure_search_endpoint_key: cleared(
            current.qna_azure_search_endpoint_key,
            &previous.qna_azure_search_endpoint_key,
        ),
        aad_client_id: cleared(current.aad_client_id, &previous.aad_client_id),
        aad_tenant_id: cleared(current.aad_tenant_id, &previous.aad_tenant_id),
        super_user: cleared(current.super_user, &previous.super_user),
        website_name: cleared(current.website_name, &previous.website_name),
    };
    props.api_properties = (!api_properties.is_empty()).then_some(api_properties);

    Ok(payload)
}

/// Convert an ARM account (and its keys) into state.
///
/// `prior` supplies the write-only search service key.
pub fn flatten(
    id: &AccountId,
    account: &Account,
    keys: Option<&ApiKeys>,
    prior: Option<&CognitiveAccount>,
) -> CognitiveAccount {
    let props = &account.properties;
    let api = props.api_properties.clone().unwrap_or_default();

    CognitiveAccount {
        name: id.account_name.clone(),
        resource_group_name: id.resource_group_name.clone(),
        location: account
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        kind: account.kind.clone().unwrap_or_default(),
        sku_name: account
            .sku
            .as_ref()
            .map(|sku| sku.name.clone())
            .unwrap_or_default(),
        custom_subdomain_name: props.custom_sub_domain_name.clone(),
        dynamic_throttling_enabled: props.dynamic_throttling_enabled.unwrap_or_default(),
        fqdns: props.allowed_fqdn_list.clone().unwrap_or_default(),
        identity: flatten_identity(account.identity.as_ref()),
        local_auth_enabled: !props.disable_local_auth.unwrap_or(false),
        metrics_advisor_aad_client_id: api.aad_client_id,
        metrics_advisor_aad_tenant_id: api.aad_tenant_id,
        metrics_advisor_super_user_name: api.super_user,
        metrics_advisor_website_name: api.website_name,
        network_acls: flatten_network_acls(props.network_acls.as_ref()),
        outbound_network_access_restricted: props
            .restrict_outbound_network_access
            .unwrap_or_default(),
        project_management_enabled: props.allow_project_management.unwrap_or_default(),
        public_network_access_enabled: props.public_network_access.as_deref() != Some("Disabled"),
        qna_runtime_endpoint: api.qna_runtime_endpoint,
        custom_question_answering_search_service_id: api.qna_azure_search_endpoint_id,
        custom_question_answering_search_service_key: prior
            .and_then(|p| p.custom_question_answering_search_service_key.clone()),
        storage: flatten_storage(props.user_owned_storage.as_ref()),
        customer_managed_key: flatten_customer_managed_key(props.encryption.as_ref()),
        tags: account.tags.clone().unwrap_or_default(),
        endpoint: props.endpoint.clone(),
        primary_access_key: keys.and_then(|k| k.key1.clone()),
        secondary_access_key: keys.and_then(|k| k.key2.clone()),
    }
}

// ---------------------------------------------------------------------------
// Locks
// ---------------------------------------------------------------------------

/// Virtual network and subnet names referenced by `acls`, de-duplicated.
pub(crate) fn network_lock_names(
    acls: Option<&NetworkAcls>,
) -> ProviderResult<(Vec<String>, Vec<String>)> {
    let mut virtual_networks = Vec::new();
    let mut subnets = Vec::new();
    for rule in acls.map(|a| a.virtual_network_rules.as_slice()).unwrap_or_default() {
        let subnet: SubnetId = rule.subnet_id.parse()?;
        if !virtual_networks.contains(&subnet.virtual_network_name) {
            virtual_networks.push(subnet.virtual_network_name);
        }
        if !subnets.contains(&subnet.subnet_name) {
            subnets.push(subnet.subnet_name);
        }
    }
    Ok((virtual_networks, subnets))
}

/// Lock every virtual network, then every subnet, the rules reference.
pub(crate) async fn lock_networks(
    acls: Option<&NetworkAcls>,
) -> ProviderResult<Vec<NamedLockGuard>> {
    let (virtual_networks, subnets) = network_lock_names(acls)?;
    let mut guards = locks::lock_multiple_by_name(&virtual_networks, VIRTUAL_NETWORK_LOCK).await;
    guards.extend(locks::lock_multiple_by_name(&subnets, SUBNET_LOCK).await);
    Ok(guards)
}

// ---------------------------------------------------------------------------
// API functions
// ---------------------------------------------------------------------------

fn account_path(id: &AccountId) -> String {
    format!("{id}?{API_VERSION}")
}

fn deleted_account_path(id: &AccountId, location: &str) -> String {
    format!(
        "/subscriptions/{}/providers/{COGNITIVE_NAMESPACE}/locations/{}/resourceGroups/{}/deletedAccounts/{}?{API_VERSION}",
        id.subscription_id,
        normalize_location(location),
        id.resource_group_name,
        id.account_name
    )
}

/// Get an account.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::get` with field `account`.
#[tracing::instrument(
    name = "cognitive::accounts::get",
    skip(client),
    fields(account = %id.account_name)
)]
pub async fn get(client: &ArmClient, id: &AccountId) -> ProviderResult<Account> {
    tracing::debug!("getting account");

    let response = client.get(&account_path(id)).await?;
    let account = response.json::<Account>().await?;

    Ok(account)
}

/// Create (or fully replace) an account and wait until it is provisioned.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::create` with fields `account`
/// and `kind`.
#[tracing::instrument(
    name = "cognitive::accounts::create",
    skip(client, account),
    fields(account = %id.account_name, kind = ?account.kind)
)]
pub async fn create(client: &ArmClient, id: &AccountId, account: &Account) -> ProviderResult<Account> {
    tracing::debug!("creating account");

    let path = account_path(id);
    let response = client.put(&path, account).await?;
    lro::wait_for_completion(client, response).await?;
    let body = lro::wait_for_provisioning_state(client, &path).await?;
    let created = serde_json::from_value::<Account>(body)?;

    tracing::debug!(endpoint = ?created.properties.endpoint, "account created");
    Ok(created)
}

/// Patch an account and wait until it is provisioned again.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::update` with field `account`.
#[tracing::instrument(
    name = "cognitive::accounts::update",
    skip(client, account),
    fields(account = %id.account_name)
)]
pub async fn update(client: &ArmClient, id: &AccountId, account: &Account) -> ProviderResult<Account> {
    tracing::debug!("updating account");

    let path = account_path(id);
    let response = client.patch(&path, account).await?;
    lro::wait_for_completion(client, response).await?;
    let body = lro::wait_for_provisioning_state(client, &path).await?;

    tracing::debug!("account updated");
    Ok(serde_json::from_value(body)?)
}

/// List the account's access keys.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::list_keys` with field `account`.
#[tracing::instrument(
    name = "cognitive::accounts::list_keys",
    skip(client),
    fields(account = %id.account_name)
)]
pub async fn list_keys(client: &ArmClient, id: &AccountId) -> ProviderResult<ApiKeys> {
    tracing::debug!("listing account keys");

    let path = format!("{id}/listKeys?{API_VERSION}");
    let response = client.post(&path, None::<&()>).await?;
    let keys = response.json::<ApiKeys>().await?;

    Ok(keys)
}

/// Delete an account. The account becomes soft-deleted.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::delete` with field `account`.
#[tracing::instrument(
    name = "cognitive::accounts::delete",
    skip(client),
    fields(account = %id.account_name)
)]
pub async fn delete(client: &ArmClient, id: &AccountId) -> ProviderResult<()> {
    tracing::debug!("deleting account");

    let response = client.delete(&account_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("account deleted");
    Ok(())
}

/// Permanently remove a soft-deleted account so its name can be reused.
///
/// # Tracing
///
/// Emits a span named `cognitive::accounts::purge` with field `account`.
#[tracing::instrument(
    name = "cognitive::accounts::purge",
    skip(client),
    fields(account = %id.account_name)
)]
pub async fn purge(client: &ArmClient, id: &AccountId, location: &str) -> ProviderResult<()> {
    tracing::debug!("purging soft-deleted account");

    let response = client.delete(&deleted_account_path(id, location)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("account purged");
    Ok(())
}

/// Delete an account, then purge it when the provider is configured to.
pub(crate) async fn delete_and_maybe_purge(
    ctx: &ResourceContext,
    id: &AccountId,
) -> ProviderResult<()> {
    let Some(existing) = not_found_to_none(get(&ctx.client, id).await)? else {
        tracing::warn!(account = %id.account_name, "account already gone");
        return Ok(());
    };

    delete(&ctx.client, id).await?;

    if ctx.features.cognitive_account.purge_soft_delete_on_destroy {
        let location = existing.location.unwrap_or_default();
        purge(&ctx.client, id, &location).await?;
    }
    Ok(())
}

/// Read an account and, when local auth is on, its keys.
pub(crate) async fn get_with_keys(
    client: &ArmClient,
    id: &AccountId,
) -> ProviderResult<Option<(Account, Option<ApiKeys>)>> {
    let Some(account) = not_found_to_none(get(client, id).await)? else {
        return Ok(None);
    };

    let keys = if account.properties.disable_local_auth == Some(true) {
        None
    } else {
        Some(list_keys(client, id).await?)
    };
    Ok(Some((account, keys)))
}

// ---------------------------------------------------------------------------
// Resource adapter
// ---------------------------------------------------------------------------

/// Adapter for `azurerm_cognitive_account`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CognitiveAccountResource;

#[async_trait]
impl ResourceAdapter for CognitiveAccountResource {
    type Model = CognitiveAccount;
    type Id = AccountId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CognitiveAccount) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(&self, ctx: &ResourceContext, model: &CognitiveAccount) -> ProviderResult<AccountId> {
        let id = AccountId::new(
            ctx.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        let payload = expand(model)?;
        let _locks = lock_networks(model.network_acls.as_ref()).await?;
        create(&ctx.client, &id, &payload).await?;

        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &AccountId,
        prior: Option<&CognitiveAccount>,
    ) -> ProviderResult<Option<CognitiveAccount>> {
        let Some((account, keys)) = get_with_keys(&ctx.client, id).await? else {
            return Ok(None);
        };
        Ok(Some(flatten(id, &account, keys.as_ref(), prior)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &AccountId,
        prior: &CognitiveAccount,
        model: &CognitiveAccount,
    ) -> ProviderResult<()> {
        let payload = expand_patch(prior, model)?;

        let _locks = lock_networks(model.network_acls.as_ref()).await?;
        update(&ctx.client, id, &payload).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &ResourceContext, id: &AccountId) -> ProviderResult<()> {
        delete_and_maybe_purge(ctx, id).await
    }
}
