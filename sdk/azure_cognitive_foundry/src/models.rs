//! ARM shapes for projects and connections.

use std::collections::BTreeMap;

pub(crate) use azure_cognitive_core::models::API_VERSION;
use azure_cognitive_core::models::{IdentityPayload, Tags};
use serde::{Deserialize, Serialize};

/// A `Microsoft.CognitiveServices/accounts/projects` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub properties: ProjectProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// A `.../connections` resource under an account or a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: ConnectionProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProperties {
    pub auth_type: String,
    pub category: String,
    pub target: String,
    /// Only sent on writes; ARM never echoes secrets back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<ConnectionCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_shared_to_all: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConnectionCredentials {
    ApiKey { key: String },
    CustomKeys { keys: BTreeMap<String, String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_serialize_by_shape() {
        let key = ConnectionCredentials::ApiKey { key: "k".into() };
        assert_eq!(serde_json::to_value(&key).unwrap(), serde_json::json!({"key": "k"}));

        let keys = ConnectionCredentials::CustomKeys {
            keys: BTreeMap::from([("a".to_string(), "b".to_string())]),
        };
        assert_eq!(
            serde_json::to_value(&keys).unwrap(),
            serde_json::json!({"keys": {"a": "b"}})
        );
    }

    #[test]
    fn connection_without_credentials_deserializes() {
        let connection: Connection = serde_json::from_value(serde_json::json!({
            "properties": {"authType": "AAD", "category": "AzureOpenAI", "target": "https://x"}
        }))
        .unwrap();
        assert!(connection.properties.credentials.is_none());
        assert_eq!(connection.properties.auth_type, "AAD");
    }
}
