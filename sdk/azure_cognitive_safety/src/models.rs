//! ARM shapes for RAI policies, blocklists and blocklist items.

pub(crate) use azure_cognitive_core::models::API_VERSION;
use azure_cognitive_core::models::Tags;
use serde::{Deserialize, Serialize};

/// A `.../raiPolicies` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default)]
    pub properties: RaiPolicyProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiPolicyProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_policy_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub content_filters: Vec<ContentFilter>,
    #[serde(default)]
    pub custom_blocklists: Vec<CustomBlocklist>,
    /// Set by ARM: `UserManaged` or `SystemManaged`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilter {
    pub name: String,
    pub enabled: bool,
    pub blocking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_threshold: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBlocklist {
    pub blocklist_name: String,
    pub blocking: bool,
    pub source: String,
}

/// A `.../raiBlocklists` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiBlocklist {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: RaiBlocklistProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiBlocklistProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A `.../raiBlocklists/{name}/raiBlocklistItems` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiBlocklistItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: RaiBlocklistItemProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiBlocklistItemProperties {
    pub pattern: String,
    pub is_regex: bool,
}
