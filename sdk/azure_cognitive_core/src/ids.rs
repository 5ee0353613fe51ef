//! Typed Azure resource IDs.
//!
//! ARM IDs are alternating `key/value` segments. Parsing compares keys
//! case-insensitively (ARM itself returns `resourcegroups` from some APIs)
//! and `Display` always renders the canonical casing, so an ID read back from
//! Azure compares equal to the one the adapter built.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use url::Url;

use crate::error::{ProviderError, ProviderResult};

/// Resource provider namespace of every Cognitive Services resource.
pub const COGNITIVE_NAMESPACE: &str = "Microsoft.CognitiveServices";

/// Resource provider namespace of virtual networks.
pub const NETWORK_NAMESPACE: &str = "Microsoft.Network";

/// Common bound for IDs that adapters hand to the host.
pub trait ResourceIdentifier:
    FromStr<Err = ProviderError> + fmt::Display + fmt::Debug + Clone + Send + Sync + 'static
{
    /// Human-readable ID kind used in error messages.
    const KIND: &'static str;
}

/// Split `input` into segment values, checking keys against `expected`.
///
/// Each expected entry is a key plus an optional fixed value (used for the
/// `providers/<namespace>` pair). Returned values exclude fixed ones.
fn parse_segments(
    kind: &'static str,
    input: &str,
    expected: &[(&str, Option<&str>)],
) -> ProviderResult<Vec<String>> {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Err(ProviderError::invalid_id(kind, input, "ID must start with '/'"));
    };

    let parts: Vec<&str> = rest.split('/').collect();
    if parts.len() != expected.len() * 2 {
        return Err(ProviderError::invalid_id(
            kind,
            input,
            format!(
                "expected {} segments, got {}",
                expected.len() * 2,
                parts.len()
            ),
        ));
    }

    let mut values = Vec::with_capacity(expected.len());
    for (pair, (key, fixed)) in parts.chunks(2).zip(expected) {
        let (actual_key, value) = (pair[0], pair[1]);
        if !actual_key.eq_ignore_ascii_case(key) {
            return Err(ProviderError::invalid_id(
                kind,
                input,
                format!("expected segment {key:?}, got {actual_key:?}"),
            ));
        }
        if value.is_empty() {
            return Err(ProviderError::invalid_id(
                kind,
                input,
                format!("segment {key:?} has an empty value"),
            ));
        }
        match fixed {
            Some(fixed) if !value.eq_ignore_ascii_case(fixed) => {
                return Err(ProviderError::invalid_id(
                    kind,
                    input,
                    format!("expected {key:?} to be {fixed:?}, got {value:?}"),
                ));
            }
            Some(_) => {}
            None => values.push(value.to_string()),
        }
    }

    Ok(values)
}

const ACCOUNT_SEGMENTS: [(&str, Option<&str>); 4] = [
    ("subscriptions", None),
    ("resourceGroups", None),
    ("providers", Some(COGNITIVE_NAMESPACE)),
    ("accounts", None),
];

/// ID of a Cognitive Services account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub account_name: String,
}

impl AccountId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            account_name: account_name.into(),
        }
    }

    fn from_values(mut values: Vec<String>) -> Self {
        let account_name = values.pop().unwrap_or_default();
        let resource_group_name = values.pop().unwrap_or_default();
        let subscription_id = values.pop().unwrap_or_default();
        Self {
            subscription_id,
            resource_group_name,
            account_name,
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/accounts/{}",
            self.subscription_id, self.resource_group_name, COGNITIVE_NAMESPACE, self.account_name
        )
    }
}

impl FromStr for AccountId {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        parse_segments(Self::KIND, s, &ACCOUNT_SEGMENTS).map(Self::from_values)
    }
}

impl ResourceIdentifier for AccountId {
    const KIND: &'static str = "Cognitive Account";
}

/// Marker describing one kind of account child resource.
pub trait ChildSegment: fmt::Debug + Clone + Send + Sync + 'static {
    /// The collection segment under the account (`deployments`, ...).
    const SEGMENT: &'static str;
    /// Human-readable ID kind.
    const KIND: &'static str;
}

/// ID of a resource nested directly under a Cognitive Services account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildId<S> {
    pub account: AccountId,
    pub name: String,
    segment: PhantomData<S>,
}

impl<S: ChildSegment> ChildId<S> {
    pub fn new(account: AccountId, name: impl Into<String>) -> Self {
        Self {
            account,
            name: name.into(),
            segment: PhantomData,
        }
    }
}

impl<S: ChildSegment> fmt::Display for ChildId<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account, S::SEGMENT, self.name)
    }
}

impl<S: ChildSegment> FromStr for ChildId<S> {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        let mut expected = ACCOUNT_SEGMENTS.to_vec();
        expected.push((S::SEGMENT, None));
        let mut values = parse_segments(S::KIND, s, &expected)?;
        let name = values.pop().unwrap_or_default();
        Ok(Self::new(AccountId::from_values(values), name))
    }
}

impl<S: ChildSegment> ResourceIdentifier for ChildId<S> {
    const KIND: &'static str = S::KIND;
}

macro_rules! child_segment {
    ($marker:ident, $alias:ident, $segment:literal, $kind:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $marker;

        impl ChildSegment for $marker {
            const SEGMENT: &'static str = $segment;
            const KIND: &'static str = $kind;
        }

        pub type $alias = ChildId<$marker>;
    };
}

child_segment!(Deployments, DeploymentId, "deployments", "Deployment");
child_segment!(Projects, ProjectId, "projects", "Project");
child_segment!(Connections, AccountConnectionId, "connections", "Account Connection");
child_segment!(CommitmentPlans, CommitmentPlanId, "commitmentPlans", "Commitment Plan");
child_segment!(RaiPolicies, RaiPolicyId, "raiPolicies", "Rai Policy");
child_segment!(RaiBlocklists, RaiBlocklistId, "raiBlocklists", "Rai Blocklist");

/// ID of a connection scoped to a Foundry project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectConnectionId {
    pub project: ProjectId,
    pub name: String,
}

impl ProjectConnectionId {
    pub fn new(project: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProjectConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/connections/{}", self.project, self.name)
    }
}

impl FromStr for ProjectConnectionId {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        let mut expected = ACCOUNT_SEGMENTS.to_vec();
        expected.extend([("projects", None), ("connections", None)]);
        let mut values = parse_segments(Self::KIND, s, &expected)?;
        let name = values.pop().unwrap_or_default();
        let project_name = values.pop().unwrap_or_default();
        Ok(Self {
            project: ProjectId::new(AccountId::from_values(values), project_name),
            name,
        })
    }
}

impl ResourceIdentifier for ProjectConnectionId {
    const KIND: &'static str = "Project Connection";
}

/// ID of a connection owned by either an account or a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionId {
    Account(AccountConnectionId),
    Project(ProjectConnectionId),
}

impl ConnectionId {
    /// Build the ID of connection `name` under `parent_id`, which must be an
    /// account or project ID.
    pub fn under(parent_id: &str, name: impl Into<String>) -> ProviderResult<Self> {
        if let Ok(project) = parent_id.parse::<ProjectId>() {
            return Ok(Self::Project(ProjectConnectionId::new(project, name)));
        }
        match parent_id.parse::<AccountId>() {
            Ok(account) => Ok(Self::Account(AccountConnectionId::new(account, name))),
            Err(_) => Err(ProviderError::invalid_id(
                "Connection Parent",
                parent_id,
                "expected a Cognitive Services account or project ID",
            )),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Account(id) => &id.name,
            Self::Project(id) => &id.name,
        }
    }

    /// The account that ultimately owns the connection.
    pub fn account(&self) -> &AccountId {
        match self {
            Self::Account(id) => &id.account,
            Self::Project(id) => &id.project.account,
        }
    }

    /// The account or project ID the connection hangs off.
    pub fn parent_id(&self) -> String {
        match self {
            Self::Account(id) => id.account.to_string(),
            Self::Project(id) => id.project.to_string(),
        }
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => fmt::Display::fmt(id, f),
            Self::Project(id) => fmt::Display::fmt(id, f),
        }
    }
}

impl FromStr for ConnectionId {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        if let Ok(id) = s.parse::<ProjectConnectionId>() {
            return Ok(Self::Project(id));
        }
        match s.parse::<AccountConnectionId>() {
            Ok(id) => Ok(Self::Account(id)),
            Err(_) => Err(ProviderError::invalid_id(
                Self::KIND,
                s,
                "expected an account or project connection ID",
            )),
        }
    }
}

impl ResourceIdentifier for ConnectionId {
    const KIND: &'static str = "Connection";
}

/// ID of a single item in an RAI blocklist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RaiBlocklistItemId {
    pub blocklist: RaiBlocklistId,
    pub name: String,
}

impl RaiBlocklistItemId {
    pub fn new(blocklist: RaiBlocklistId, name: impl Into<String>) -> Self {
        Self {
            blocklist,
            name: name.into(),
        }
    }
}

impl fmt::Display for RaiBlocklistItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/raiBlocklistItems/{}", self.blocklist, self.name)
    }
}

impl FromStr for RaiBlocklistItemId {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        let mut expected = ACCOUNT_SEGMENTS.to_vec();
        expected.extend([("raiBlocklists", None), ("raiBlocklistItems", None)]);
        let mut values = parse_segments(Self::KIND, s, &expected)?;
        let name = values.pop().unwrap_or_default();
        let blocklist_name = values.pop().unwrap_or_default();
        Ok(Self {
            blocklist: RaiBlocklistId::new(AccountId::from_values(values), blocklist_name),
            name,
        })
    }
}

impl ResourceIdentifier for RaiBlocklistItemId {
    const KIND: &'static str = "Rai Blocklist Item";
}

/// ID of a virtual network subnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubnetId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub virtual_network_name: String,
    pub subnet_name: String,
}

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/virtualNetworks/{}/subnets/{}",
            self.subscription_id,
            self.resource_group_name,
            NETWORK_NAMESPACE,
            self.virtual_network_name,
            self.subnet_name
        )
    }
}

impl FromStr for SubnetId {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        let values = parse_segments(
            Self::KIND,
            s,
            &[
                ("subscriptions", None),
                ("resourceGroups", None),
                ("providers", Some(NETWORK_NAMESPACE)),
                ("virtualNetworks", None),
                ("subnets", None),
            ],
        )?;
        let [subscription_id, resource_group_name, virtual_network_name, subnet_name] =
            <[String; 4]>::try_from(values).map_err(|_| {
                ProviderError::invalid_id(Self::KIND, s, "unexpected segment count")
            })?;
        Ok(Self {
            subscription_id,
            resource_group_name,
            virtual_network_name,
            subnet_name,
        })
    }
}

impl ResourceIdentifier for SubnetId {
    const KIND: &'static str = "Subnet";
}

/// A Key Vault key URL, with or without a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyVaultKeyId {
    /// `https://<vault>.vault.azure.net/` (always with a trailing slash).
    pub key_vault_base_url: String,
    pub name: String,
    pub version: Option<String>,
}

impl fmt::Display for KeyVaultKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}keys/{}", self.key_vault_base_url, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{version}")?;
        }
        Ok(())
    }
}

impl FromStr for KeyVaultKeyId {
    type Err = ProviderError;

    fn from_str(s: &str) -> ProviderResult<Self> {
        let kind = "Key Vault Key";
        let url = Url::parse(s).map_err(|e| ProviderError::invalid_id(kind, s, e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ProviderError::invalid_id(kind, s, "missing host"))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let (name, version) = match segments.as_slice() {
            ["keys", name] => (name.to_string(), None),
            ["keys", name, version] => (name.to_string(), Some(version.to_string())),
            _ => {
                return Err(ProviderError::invalid_id(
                    kind,
                    s,
                    "expected a path of the form /keys/<name>[/<version>]",
                ))
            }
        };

        let key_vault_base_url = match url.port() {
            Some(port) => format!("{}://{host}:{port}/", url.scheme()),
            None => format!("{}://{host}/", url.scheme()),
        };

        Ok(Self {
            key_vault_base_url,
            name,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.CognitiveServices/accounts/acc";

    #[test]
    fn account_id_round_trips_canonical_casing() {
        let id: AccountId = "/subscriptions/sub/resourcegroups/rg/providers/microsoft.cognitiveservices/accounts/acc"
            .parse()
            .expect("should parse");
        assert_eq!(id, AccountId::new("sub", "rg", "acc"));
        assert_eq!(id.to_string(), ACCOUNT);
    }

    #[test]
    fn account_id_rejects_wrong_namespace() {
        let err = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Storage/accounts/acc"
            .parse::<AccountId>()
            .unwrap_err();
        assert!(err.to_string().contains("Microsoft.CognitiveServices"));
    }

    #[test]
    fn account_id_rejects_child_ids() {
        let child = format!("{ACCOUNT}/deployments/gpt");
        assert!(child.parse::<AccountId>().is_err());
    }

    #[test]
    fn account_id_rejects_missing_leading_slash() {
        assert!(ACCOUNT[1..].parse::<AccountId>().is_err());
    }

    #[test]
    fn deployment_id_parses_parent_account() {
        let id: DeploymentId = format!("{ACCOUNT}/deployments/gpt-4o").parse().unwrap();
        assert_eq!(id.account.account_name, "acc");
        assert_eq!(id.name, "gpt-4o");
        assert_eq!(id.to_string(), format!("{ACCOUNT}/deployments/gpt-4o"));
    }

    #[test]
    fn child_ids_do_not_cross_parse() {
        let policy = format!("{ACCOUNT}/raiPolicies/strict");
        assert!(policy.parse::<RaiPolicyId>().is_ok());
        assert!(policy.parse::<DeploymentId>().is_err());
        assert!(policy.parse::<RaiBlocklistId>().is_err());
    }

    #[test]
    fn commitment_plan_segment_is_case_insensitive() {
        let id: CommitmentPlanId = format!("{ACCOUNT}/commitmentplans/plan1").parse().unwrap();
        assert_eq!(id.to_string(), format!("{ACCOUNT}/commitmentPlans/plan1"));
    }

    #[test]
    fn project_connection_id_parses_both_parents() {
        let raw = format!("{ACCOUNT}/projects/proj/connections/search");
        let id: ProjectConnectionId = raw.parse().unwrap();
        assert_eq!(id.project.name, "proj");
        assert_eq!(id.project.account.account_name, "acc");
        assert_eq!(id.name, "search");
        assert_eq!(id.to_string(), raw);
        assert!(raw.parse::<AccountConnectionId>().is_err());
    }

    #[test]
    fn connection_id_accepts_either_parent() {
        let account = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.CognitiveServices/accounts/a";
        let project = format!("{account}/projects/p");

        let id = ConnectionId::under(account, "c").unwrap();
        assert!(matches!(id, ConnectionId::Account(_)));
        assert_eq!(id.to_string(), format!("{account}/connections/c"));
        assert_eq!(id.parent_id(), account);

        let id = ConnectionId::under(&project, "c").unwrap();
        assert!(matches!(id, ConnectionId::Project(_)));
        assert_eq!(id.account().account_name, "a");
        assert_eq!(id.to_string().parse::<ConnectionId>().unwrap(), id);

        assert!(ConnectionId::under("/subscriptions/s", "c").is_err());
        assert!(format!("{account}/deployments/d").parse::<ConnectionId>().is_err());
    }

    #[test]
    fn blocklist_item_id_parses() {
        let raw = format!("{ACCOUNT}/raiBlocklists/words/raiBlocklistItems/item1");
        let id: RaiBlocklistItemId = raw.parse().unwrap();
        assert_eq!(id.blocklist.name, "words");
        assert_eq!(id.name, "item1");
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn subnet_id_parses() {
        let id: SubnetId = "/subscriptions/sub/resourceGroups/net/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/default"
            .parse()
            .unwrap();
        assert_eq!(id.virtual_network_name, "vnet1");
        assert_eq!(id.subnet_name, "default");
    }

    #[test]
    fn empty_segment_value_is_rejected() {
        let raw = "/subscriptions//resourceGroups/rg/providers/Microsoft.CognitiveServices/accounts/acc";
        let err = raw.parse::<AccountId>().unwrap_err();
        assert!(err.to_string().contains("empty value"));
    }

    #[test]
    fn key_vault_key_id_with_and_without_version() {
        let versioned: KeyVaultKeyId = "https://kv1.vault.azure.net/keys/cmk/0123abcd"
            .parse()
            .unwrap();
        assert_eq!(versioned.key_vault_base_url, "https://kv1.vault.azure.net/");
        assert_eq!(versioned.name, "cmk");
        assert_eq!(versioned.version.as_deref(), Some("0123abcd"));

        let versionless: KeyVaultKeyId = "https://kv1.vault.azure.net/keys/cmk".parse().unwrap();
        assert!(versionless.version.is_none());
        assert_eq!(versionless.to_string(), "https://kv1.vault.azure.net/keys/cmk");
    }

    #[test]
    fn key_vault_key_id_rejects_secrets_path() {
        assert!("https://kv1.vault.azure.net/secrets/cmk"
            .parse::<KeyVaultKeyId>()
            .is_err());
    }
}
