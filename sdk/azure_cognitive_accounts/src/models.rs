//! ARM shapes shared by the account-family resources.
//!
//! These mirror the `Microsoft.CognitiveServices/accounts` REST payloads.
//! Everything is optional because ARM omits unset properties and `PATCH`
//! bodies only carry what changes.

pub(crate) use azure_cognitive_core::models::API_VERSION;
use azure_cognitive_core::models::{IdentityPayload, SkuPayload, Tags};
use serde::{Deserialize, Serialize};

/// `keySource` when the account encrypts with Microsoft-managed keys.
pub const KEY_SOURCE_MICROSOFT: &str = "Microsoft.CognitiveServices";

/// `keySource` when the account encrypts with a Key Vault key.
pub const KEY_SOURCE_KEY_VAULT: &str = "Microsoft.KeyVault";

/// A `Microsoft.CognitiveServices/accounts` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<SkuPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub properties: AccountProperties,
}

/// `properties` of an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_sub_domain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_throttling_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_fqdn_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_local_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_acls: Option<NetworkRuleSet>,
    /// `Enabled` or `Disabled`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restrict_outbound_network_access: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_owned_storage: Option<Vec<UserOwnedStorage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Encryption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_properties: Option<ApiProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_project_management: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Network access rules of an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRuleSet {
    /// `Allow` or `Deny`.
    pub default_action: String,
    #[serde(default)]
    pub ip_rules: Vec<IpRule>,
    #[serde(default)]
    pub virtual_network_rules: Vec<VirtualNetworkRule>,
    /// `None` or `AzureServices`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpRule {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkRule {
    /// Subnet resource ID.
    pub id: String,
    #[serde(default)]
    pub ignore_missing_vnet_service_endpoint: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOwnedStorage {
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_client_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encryption {
    /// [`KEY_SOURCE_MICROSOFT`] or [`KEY_SOURCE_KEY_VAULT`].
    pub key_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_vault_properties: Option<KeyVaultProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultProperties {
    pub key_name: String,
    /// Empty when the account tracks the latest key version.
    #[serde(default)]
    pub key_version: String,
    pub key_vault_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_client_id: Option<String>,
}

impl Encryption {
    pub fn is_key_vault(&self) -> bool {
        self.key_source.eq_ignore_ascii_case(KEY_SOURCE_KEY_VAULT)
    }
}

/// Kind-specific settings (QnA Maker, Metrics Advisor, question answering).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qna_runtime_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qna_azure_search_endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qna_azure_search_endpoint_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aad_tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub super_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_name: Option<String>,
}

impl ApiProperties {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Response of `POST .../listKeys`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub key1: Option<String>,
    #[serde(default)]
    pub key2: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_payload_omits_unset_properties() {
        let account = Account {
            kind: Some("OpenAI".into()),
            location: Some("eastus".into()),
            sku: Some(SkuPayload {
                name: "S0".into(),
                ..SkuPayload::default()
            }),
            properties: AccountProperties {
                custom_sub_domain_name: Some("contoso".into()),
                ..AccountProperties::default()
            },
            ..Account::default()
        };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "OpenAI",
                "location": "eastus",
                "sku": {"name": "S0"},
                "properties": {"customSubDomainName": "contoso"}
            })
        );
    }

    #[test]
    fn account_response_deserializes() {
        let account: Account = serde_json::from_value(serde_json::json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.CognitiveServices/accounts/a",
            "name": "a",
            "kind": "TextAnalytics",
            "location": "westeurope",
            "sku": {"name": "S"},
            "properties": {
                "endpoint": "https://a.cognitiveservices.azure.com/",
                "provisioningState": "Succeeded",
                "networkAcls": {
                    "defaultAction": "Deny",
                    "ipRules": [{"value": "10.0.0.0/24"}],
                    "virtualNetworkRules": [{"id": "/subscriptions/s/x", "state": "Succeeded"}]
                },
                "encryption": {
                    "keySource": "Microsoft.KeyVault",
                    "keyVaultProperties": {
                        "keyName": "k",
                        "keyVersion": "v1",
                        "keyVaultUri": "https://vault.vault.azure.net/"
                    }
                }
            }
        }))
        .unwrap();

        let acls = account.properties.network_acls.unwrap();
        assert_eq!(acls.default_action, "Deny");
        assert_eq!(acls.ip_rules[0].value, "10.0.0.0/24");
        assert!(!acls.virtual_network_rules[0].ignore_missing_vnet_service_endpoint);
        assert!(account.properties.encryption.unwrap().is_key_vault());
    }

    #[test]
    fn api_properties_emptiness() {
        assert!(ApiProperties::default().is_empty());
        let props = ApiProperties {
            super_user: Some("admin".into()),
            ..ApiProperties::default()
        };
        assert!(!props.is_empty());
    }
}
