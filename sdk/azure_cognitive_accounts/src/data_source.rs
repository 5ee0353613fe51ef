//! Read-only lookups of existing accounts and deployments.

use async_trait::async_trait;
use azure_cognitive_core::error::{ProviderError, ProviderResult};
use azure_cognitive_core::ids::{AccountId, DeploymentId};
use azure_cognitive_core::models::{flatten_identity, normalize_location, Identity, Tags};
use azure_cognitive_core::resource::{DataSourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Block, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::account;
use crate::deployment::{self, ModelConfig, SkuConfig};

fn computed_bool() -> Attribute {
    Attribute::computed(AttributeType::Bool)
}

fn not_found(kind: &str, id: &impl std::fmt::Display) -> ProviderError {
    ProviderError::NotFound(format!("{kind} {id}"))
}

// ---------------------------------------------------------------------------
// azurerm_cognitive_account
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AccountLookup {
    pub name: String,
    pub resource_group_name: String,
}

/// Attributes exposed by the account data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountInfo {
    pub name: String,
    pub resource_group_name: String,
    pub location: String,
    pub kind: String,
    pub sku_name: String,
    pub custom_subdomain_name: Option<String>,
    pub endpoint: Option<String>,
    pub identity: Option<Identity>,
    pub local_auth_enabled: bool,
    pub qna_runtime_endpoint: Option<String>,
    pub primary_access_key: Option<String>,
    pub secondary_access_key: Option<String>,
    pub tags: Tags,
}

/// Data source `azurerm_cognitive_account`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountDataSource;

#[async_trait]
impl DataSourceAdapter for AccountDataSource {
    type Args = AccountLookup;
    type Model = AccountInfo;

    fn type_name(&self) -> &'static str {
        account::RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute("name", Attribute::required_string())
            .attribute("resource_group_name", Attribute::required_string())
            .attribute("location", Attribute::computed_string())
            .attribute("kind", Attribute::computed_string())
            .attribute("sku_name", Attribute::computed_string())
            .attribute("custom_subdomain_name", Attribute::computed_string())
            .attribute("endpoint", Attribute::computed_string())
            .block(
                "identity",
                Block::list(
                    Schema::new()
                        .attribute("type", Attribute::computed_string())
                        .attribute(
                            "identity_ids",
                            Attribute::computed(AttributeType::Set(Box::new(AttributeType::String))),
                        )
                        .attribute("principal_id", Attribute::computed_string())
                        .attribute("tenant_id", Attribute::computed_string()),
                ),
            )
            .attribute("local_auth_enabled", computed_bool())
            .attribute("qna_runtime_endpoint", Attribute::computed_string())
            .attribute("primary_access_key", Attribute::computed_string().sensitive())
            .attribute("secondary_access_key", Attribute::computed_string().sensitive())
            .attribute(
                "tags",
                Attribute::computed(AttributeType::Map(Box::new(AttributeType::String))),
            )
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        args: &AccountLookup,
    ) -> ProviderResult<(String, AccountInfo)> {
        validate::account_name(&args.name)?;
        validate::resource_group_name(&args.resource_group_name)?;

        let id = AccountId::new(ctx.subscription_id(), &args.resource_group_name, &args.name);
        let Some((current, keys)) = account::get_with_keys(&ctx.client, &id).await? else {
            return Err(not_found("Cognitive Services account", &id));
        };

        let props = &current.properties;
        let info = AccountInfo {
            name: id.account_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            location: current
                .location
                .as_deref()
                .map(normalize_location)
                .unwrap_or_default(),
            kind: current.kind.clone().unwrap_or_default(),
            sku_name: current
                .sku
                .as_ref()
                .map(|sku| sku.name.clone())
                .unwrap_or_default(),
            custom_subdomain_name: props.custom_sub_domain_name.clone(),
            endpoint: props.endpoint.clone(),
            identity: flatten_identity(current.identity.as_ref()),
            local_auth_enabled: !props.disable_local_auth.unwrap_or(false),
            qna_runtime_endpoint: props
                .api_properties
                .as_ref()
                .and_then(|api| api.qna_runtime_endpoint.clone()),
            primary_access_key: keys.as_ref().and_then(|k| k.key1.clone()),
            secondary_access_key: keys.as_ref().and_then(|k| k.key2.clone()),
            tags: current.tags.clone().unwrap_or_default(),
        };

        Ok((id.to_string(), info))
    }
}

// ---------------------------------------------------------------------------
// azurerm_cognitive_deployment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentLookup {
    pub name: String,
    pub cognitive_account_id: String,
}

/// Attributes exposed by the deployment data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentInfo {
    pub name: String,
    pub cognitive_account_id: String,
    pub model: Option<ModelConfig>,
    pub sku: Option<SkuConfig>,
    pub rai_policy_name: Option<String>,
    pub version_upgrade_option: String,
    pub dynamic_throttling_enabled: bool,
}

/// Data source `azurerm_cognitive_deployment`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentDataSource;

#[async_trait]
impl DataSourceAdapter for DeploymentDataSource {
    type Args = DeploymentLookup;
    type Model = DeploymentInfo;

    fn type_name(&self) -> &'static str {
        deployment::RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .attribute("name", Attribute::required_string())
            .attribute("cognitive_account_id", Attribute::required_string())
            .block(
                "model",
                Block::list(
                    Schema::new()
                        .attribute("format", Attribute::computed_string())
                        .attribute("name", Attribute::computed_string())
                        .attribute("version", Attribute::computed_string()),
                ),
            )
            .block(
                "sku",
                Block::list(
                    Schema::new()
                        .attribute("name", Attribute::computed_string())
                        .attribute("tier", Attribute::computed_string())
                        .attribute("size", Attribute::computed_string())
                        .attribute("family", Attribute::computed_string())
                        .attribute("capacity", Attribute::computed(AttributeType::Int)),
                ),
            )
            .attribute("rai_policy_name", Attribute::computed_string())
            .attribute("version_upgrade_option", Attribute::computed_string())
            .attribute("dynamic_throttling_enabled", computed_bool())
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        args: &DeploymentLookup,
    ) -> ProviderResult<(String, DeploymentInfo)> {
        validate::child_name("name", &args.name)?;
        let id = DeploymentId::new(args.cognitive_account_id.parse()?, &args.name);

        let current = deployment::get(&ctx.client, &id).await.map_err(|e| {
            if e.is_not_found() {
                not_found("Cognitive Services deployment", &id)
            } else {
                e
            }
        })?;
        let state = deployment::flatten(&id, &current);

        let info = DeploymentInfo {
            name: state.name,
            cognitive_account_id: state.cognitive_account_id,
            model: state.model,
            sku: state.sku,
            rai_policy_name: state.rai_policy_name,
            version_upgrade_option: state.version_upgrade_option,
            dynamic_throttling_enabled: state.dynamic_throttling_enabled,
        };
        Ok((id.to_string(), info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account_body, account_id, account_path, setup_context};
    use azure_cognitive_core::resource::DynDataSource;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn account_lookup_returns_keys() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(account_body("OpenAI")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{}/listKeys", account_path())))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"key1": "k1", "key2": "k2"})),
            )
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynDataSource::read(
            &AccountDataSource,
            &ctx,
            serde_json::json!({"name": "acct", "resource_group_name": "rg"}),
        )
        .await
        .unwrap();

        assert_eq!(state["id"], account_path());
        assert_eq!(state["kind"], "OpenAI");
        assert_eq!(state["secondary_access_key"], "k2");
        assert_eq!(state["tags"]["env"], "test");
    }

    #[tokio::test]
    async fn account_lookup_of_missing_account_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(account_path()))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let err = DynDataSource::read(
            &AccountDataSource,
            &ctx,
            serde_json::json!({"name": "acct", "resource_group_name": "rg"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[tokio::test]
    async fn lookup_rejects_computed_arguments() {
        let server = MockServer::start().await;
        let ctx = setup_context(&server).await;

        let err = DynDataSource::read(
            &AccountDataSource,
            &ctx,
            serde_json::json!({"name": "acct", "resource_group_name": "rg", "kind": "OpenAI"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn deployment_lookup() {
        let server = MockServer::start().await;
        let id = DeploymentId::new(account_id(), "gpt4o");
        Mock::given(method("GET"))
            .and(path(id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sku": {"name": "Standard", "capacity": 5},
                "properties": {
                    "model": {"format": "OpenAI", "name": "gpt-4o", "version": "1"},
                    "raiPolicyName": "Microsoft.Default"
                }
            })))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynDataSource::read(
            &DeploymentDataSource,
            &ctx,
            serde_json::json!({"name": "gpt4o", "cognitive_account_id": account_path()}),
        )
        .await
        .unwrap();

        assert_eq!(state["id"], id.to_string());
        assert_eq!(state["sku"]["capacity"], 5);
        assert_eq!(state["rai_policy_name"], "Microsoft.Default");
    }
}
