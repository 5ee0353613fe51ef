//! Shapes shared by every Cognitive Services resource.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{Attribute, AttributeType, Block, Schema};

/// API version query parameter for all `Microsoft.CognitiveServices` requests.
pub const API_VERSION: &str = "api-version=2025-06-01";

/// Resource tags.
pub type Tags = BTreeMap<String, String>;

pub const IDENTITY_SYSTEM_ASSIGNED: &str = "SystemAssigned";
pub const IDENTITY_USER_ASSIGNED: &str = "UserAssigned";
pub const IDENTITY_SYSTEM_AND_USER_ASSIGNED: &str = "SystemAssigned, UserAssigned";
pub const IDENTITY_NONE: &str = "None";

/// Managed identity block as configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    #[serde(rename = "type")]
    pub identity_type: String,
    pub identity_ids: Vec<String>,
    pub principal_id: Option<String>,
    pub tenant_id: Option<String>,
}

/// Managed identity as ARM sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPayload {
    #[serde(rename = "type")]
    pub identity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_assigned_identities: Option<BTreeMap<String, UserAssignedIdentity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// Details of one user-assigned identity (empty on requests).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedIdentity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

fn normalize_identity_type(raw: &str) -> Option<&'static str> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "systemassigned" => Some(IDENTITY_SYSTEM_ASSIGNED),
        "userassigned" => Some(IDENTITY_USER_ASSIGNED),
        "systemassigned,userassigned" => Some(IDENTITY_SYSTEM_AND_USER_ASSIGNED),
        _ => None,
    }
}

impl Identity {
    /// Schema block for `identity`.
    pub fn schema_block() -> Block {
        Block::single(
            false,
            Schema::new()
                .attribute("type", Attribute::required_string())
                .attribute("identity_ids", Attribute::string_set())
                .attribute("principal_id", Attribute::computed_string())
                .attribute("tenant_id", Attribute::computed_string()),
        )
    }

    pub fn system_assigned() -> Self {
        Self {
            identity_type: IDENTITY_SYSTEM_ASSIGNED.to_string(),
            ..Self::default()
        }
    }

    fn includes_user_assigned(&self) -> bool {
        normalize_identity_type(&self.identity_type)
            .is_some_and(|t| t.contains(IDENTITY_USER_ASSIGNED))
    }

    pub fn validate(&self) -> ProviderResult<()> {
        if normalize_identity_type(&self.identity_type).is_none() {
            return Err(ProviderError::Validation(format!(
                "identity.type must be one of {IDENTITY_SYSTEM_ASSIGNED:?}, \
                 {IDENTITY_USER_ASSIGNED:?} or {IDENTITY_SYSTEM_AND_USER_ASSIGNED:?}, got {:?}",
                self.identity_type
            )));
        }
        match (self.includes_user_assigned(), self.identity_ids.is_empty()) {
            (true, true) => Err(ProviderError::Validation(
                "identity.identity_ids is required when type includes UserAssigned".into(),
            )),
            (false, false) => Err(ProviderError::Validation(
                "identity.identity_ids can only be set when type includes UserAssigned".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// Convert the configured identity to its ARM form.
pub fn expand_identity(identity: Option<&Identity>) -> Option<IdentityPayload> {
    let identity = identity?;
    let identity_type = normalize_identity_type(&identity.identity_type)
        .unwrap_or(IDENTITY_SYSTEM_ASSIGNED)
        .to_string();

    let user_assigned_identities = identity.includes_user_assigned().then(|| {
        identity
            .identity_ids
            .iter()
            .map(|id| (id.clone(), UserAssignedIdentity::default()))
            .collect()
    });

    Some(IdentityPayload {
        identity_type,
        user_assigned_identities,
        principal_id: None,
        tenant_id: None,
    })
}

/// ARM identity for a request; an absent block explicitly removes identities.
pub fn expand_identity_or_none(identity: Option<&Identity>) -> IdentityPayload {
    expand_identity(identity).unwrap_or_else(|| IdentityPayload {
        identity_type: IDENTITY_NONE.to_string(),
        ..IdentityPayload::default()
    })
}

/// `current`, or an empty string when only `prior` had a value.
///
/// PATCH keeps properties a request omits, so a string removed from the
/// configuration has to be sent empty to clear it.
pub fn cleared(current: Option<String>, prior: &Option<String>) -> Option<String> {
    current.or_else(|| prior.as_ref().map(|_| String::new()))
}

/// Convert an ARM identity back to state. `None` type means no identity.
pub fn flatten_identity(payload: Option<&IdentityPayload>) -> Option<Identity> {
    let payload = payload?;
    let identity_type = normalize_identity_type(&payload.identity_type)?;

    let mut identity_ids: Vec<String> = payload
        .user_assigned_identities
        .as_ref()
        .map(|ids| ids.keys().cloned().collect())
        .unwrap_or_default();
    identity_ids.sort();

    Some(Identity {
        identity_type: identity_type.to_string(),
        identity_ids,
        principal_id: payload.principal_id.clone(),
        tenant_id: payload.tenant_id.clone(),
    })
}

/// Deserialize a single nested block given either as an object or as a
/// one-element list.
///
/// Use with `#[serde(default, deserialize_with = "...")]` on `Option<T>`.
pub fn single_block<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrList<T> {
        One(T),
        List(Vec<T>),
    }

    Ok(
        match Option::<OneOrList<T>>::deserialize(deserializer)? {
            None => None,
            Some(OneOrList::One(value)) => Some(value),
            Some(OneOrList::List(values)) => values.into_iter().next(),
        },
    )
}

/// Schema attribute for `tags`.
pub fn tags_attribute() -> Attribute {
    Attribute::optional(AttributeType::Map(Box::new(AttributeType::String)))
}

/// ARM limits: 50 tags, keys up to 512 characters, values up to 256.
pub fn validate_tags(tags: &Tags) -> ProviderResult<()> {
    if tags.len() > 50 {
        return Err(ProviderError::Validation(format!(
            "a maximum of 50 tags can be applied to each resource, got {}",
            tags.len()
        )));
    }
    for (key, value) in tags {
        if key.len() > 512 {
            return Err(ProviderError::Validation(format!(
                "the maximum length for a tag key is 512 characters: {key:?} is {} characters",
                key.len()
            )));
        }
        if value.len() > 256 {
            return Err(ProviderError::Validation(format!(
                "the maximum length for a tag value is 256 characters: the value for {key:?} is {} characters",
                value.len()
            )));
        }
    }
    Ok(())
}

/// `West Europe` -> `westeurope`.
pub fn normalize_location(location: &str) -> String {
    location
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// ARM `sku` object used by accounts and deployments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
}
