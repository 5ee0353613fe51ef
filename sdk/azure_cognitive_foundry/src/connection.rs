//! Connections (`azurerm_cognitive_account_connection`).
//!
//! A connection points an account or one of its projects at an external
//! service. `parent_id` decides which; the resource ID is a
//! [`ConnectionId`] covering both shapes.
//!
//! Credentials are write-only. ARM accepts them on `PUT` but never returns
//! them, so [`read`](ConnectionResource) copies `api_key` and `custom_keys`
//! forward from the prior state.

use std::collections::BTreeMap;

use async_trait::async_trait;
use azure_cognitive_accounts::account;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::ConnectionId;
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::models::{Connection, ConnectionCredentials, ConnectionProperties, API_VERSION};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_connection";

pub const AUTH_AAD: &str = "AAD";
pub const AUTH_API_KEY: &str = "ApiKey";
pub const AUTH_CUSTOM_KEYS: &str = "CustomKeys";
pub const AUTH_NONE: &str = "None";

pub const AUTH_TYPES: &[&str] = &[AUTH_AAD, AUTH_API_KEY, AUTH_CUSTOM_KEYS, AUTH_NONE];

/// Declarative state of a connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveConnection {
    pub name: String,
    /// ID of the owning account or project.
    pub parent_id: String,
    pub category: String,
    pub target: String,
    pub auth_type: String,
    pub api_key: Option<String>,
    pub custom_keys: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
    pub shared_to_all: bool,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute(
            "parent_id",
            Attribute::required_string()
                .force_new()
                .description("ID of the Cognitive Services account or project that owns the connection"),
        )
        .attribute("category", Attribute::required_string().force_new())
        .attribute("target", Attribute::required_string())
        .attribute("auth_type", Attribute::required_string().force_new())
        .attribute("api_key", Attribute::optional_string().sensitive())
        .attribute("custom_keys", Attribute::string_map().sensitive())
        .attribute("metadata", Attribute::string_map())
        .attribute(
            "shared_to_all",
            Attribute::optional(AttributeType::Bool).default_value(false),
        )
}

pub fn validate(model: &CognitiveConnection) -> ProviderResult<()> {
    validate::child_name("name", &model.name)?;
    ConnectionId::under(&model.parent_id, &model.name)?;
    validate::not_empty("category", &model.category)?;
    validate::not_empty("target", &model.target)?;
    validate::one_of("auth_type", &model.auth_type, AUTH_TYPES)?;

    let has_api_key = model.api_key.as_deref().is_some_and(|k| !k.is_empty());
    let has_custom_keys = !model.custom_keys.is_empty();
    match model.auth_type.as_str() {
        AUTH_API_KEY if !has_api_key => Err(ProviderError::Validation(
            "`api_key` is required when auth_type is `ApiKey`".into(),
        )),
        AUTH_CUSTOM_KEYS if !has_custom_keys => Err(ProviderError::Validation(
            "`custom_keys` is required when auth_type is `CustomKeys`".into(),
        )),
        AUTH_API_KEY if has_custom_keys => Err(ProviderError::Validation(
            "`custom_keys` can only be set when auth_type is `CustomKeys`".into(),
        )),
        AUTH_CUSTOM_KEYS if has_api_key => Err(ProviderError::Validation(
            "`api_key` can only be set when auth_type is `ApiKey`".into(),
        )),
        AUTH_AAD | AUTH_NONE if has_api_key || has_custom_keys => {
            Err(ProviderError::Validation(format!(
                "credentials cannot be set when auth_type is `{}`",
                model.auth_type
            )))
        }
        _ => Ok(()),
    }
}

fn expand_credentials(model: &CognitiveConnection) -> Option<ConnectionCredentials> {
    match model.auth_type.as_str() {
        AUTH_API_KEY => model
            .api_key
            .clone()
            .map(|key| ConnectionCredentials::ApiKey { key }),
        AUTH_CUSTOM_KEYS => Some(ConnectionCredentials::CustomKeys {
            keys: model.custom_keys.clone(),
        }),
        _ => None,
    }
}

pub fn expand(model: &CognitiveConnection) -> Connection {
    Connection {
        id: None,
        properties: ConnectionProperties {
            auth_type: model.auth_type.clone(),
            category: model.category.clone(),
            target: model.target.clone(),
            credentials: expand_credentials(model),
            metadata: (!model.metadata.is_empty()).then(|| model.metadata.clone()),
            is_shared_to_all: Some(model.shared_to_all),
        },
    }
}

/// Convert an ARM connection to state, carrying secrets over from `prior`.
pub fn flatten(
    id: &ConnectionId,
    connection: &Connection,
    prior: Option<&CognitiveConnection>,
) -> CognitiveConnection {
    let props = &connection.properties;
    CognitiveConnection {
        name: id.name().to_string(),
        parent_id: id.parent_id(),
        category: props.category.clone(),
        target: props.target.clone(),
        auth_type: props.auth_type.clone(),
        api_key: prior.and_then(|p| p.api_key.clone()),
        custom_keys: prior.map(|p| p.custom_keys.clone()).unwrap_or_default(),
        metadata: props.metadata.clone().unwrap_or_default(),
        shared_to_all: props.is_shared_to_all.unwrap_or_default(),
    }
}

fn connection_path(id: &ConnectionId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get a connection. Credentials are never included.
///
/// # Tracing
///
/// Emits a span named `cognitive::connections::get` with fields `account`
/// and `connection`.
#[tracing::instrument(
    name = "cognitive::connections::get",
    skip(client),
    fields(account = %id.account().account_name, connection = %id.name())
)]
pub async fn get(client: &ArmClient, id: &ConnectionId) -> ProviderResult<Connection> {
    tracing::debug!("getting connection");

    let response = client.get(&connection_path(id)).await?;
    let connection = response.json::<Connection>().await?;

    Ok(connection)
}

/// Create or replace a connection.
///
/// # Tracing
///
/// Emits a span named `cognitive::connections::create_or_update` with fields
/// `account`, `connection`, and `auth_type`.
#[tracing::instrument(
    name = "cognitive::connections::create_or_update",
    skip(client, connection),
    fields(
        account = %id.account().account_name,
        connection = %id.name(),
        auth_type = %connection.properties.auth_type
    )
)]
pub async fn create_or_update(
    client: &ArmClient,
    id: &ConnectionId,
    connection: &Connection,
) -> ProviderResult<()> {
    tracing::debug!("writing connection");

    let _lock = locks::lock_by_name(&id.account().account_name, account::RESOURCE_TYPE).await;
    let response = client.put(&connection_path(id), connection).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("connection written");
    Ok(())
}

/// Delete a connection.
///
/// # Tracing
///
/// Emits a span named `cognitive::connections::delete` with fields `account`
/// and `connection`.
#[tracing::instrument(
    name = "cognitive::connections::delete",
    skip(client),
    fields(account = %id.account().account_name, connection = %id.name())
)]
pub async fn delete(client: &ArmClient, id: &ConnectionId) -> ProviderResult<()> {
    tracing::debug!("deleting connection");

    let _lock = locks::lock_by_name(&id.account().account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&connection_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("connection deleted");
    Ok(())
}

/// Adapter for `azurerm_cognitive_account_connection`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionResource;

#[async_trait]
impl ResourceAdapter for ConnectionResource {
    type Model = CognitiveConnection;
    type Id = ConnectionId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CognitiveConnection) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(
        &self,
        ctx: &ResourceContext,
        model: &CognitiveConnection,
    ) -> ProviderResult<ConnectionId> {
        let id = ConnectionId::under(&model.parent_id, &model.name)?;
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create_or_update(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &ConnectionId,
        prior: Option<&CognitiveConnection>,
    ) -> ProviderResult<Option<CognitiveConnection>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|connection| flatten(id, &connection, prior)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &ConnectionId,
        _prior: &CognitiveConnection,
        model: &CognitiveConnection,
    ) -> ProviderResult<()> {
        create_or_update(&ctx.client, id, &expand(model)).await
    }

    async fn delete(&self, ctx: &ResourceContext, id: &ConnectionId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account_id, project_id, setup_context};
    use azure_cognitive_core::resource::DynResource;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connection() -> CognitiveConnection {
        CognitiveConnection {
            name: "openai".into(),
            parent_id: project_id().to_string(),
            category: "AzureOpenAI".into(),
            target: "https://contoso.openai.azure.com/".into(),
            auth_type: AUTH_API_KEY.into(),
            api_key: Some("secret".into()),
            metadata: BTreeMap::from([("ApiType".to_string(), "Azure".to_string())]),
            ..CognitiveConnection::default()
        }
    }

    fn connection_id() -> ConnectionId {
        ConnectionId::under(&project_id().to_string(), "openai").unwrap()
    }

    fn connection_body() -> serde_json::Value {
        serde_json::json!({
            "id": connection_id().to_string(),
            "properties": {
                "authType": "ApiKey",
                "category": "AzureOpenAI",
                "target": "https://contoso.openai.azure.com/",
                "metadata": {"ApiType": "Azure"},
                "isSharedToAll": false
            }
        })
    }

    #[test]
    fn credentials_must_match_auth_type() {
        assert!(validate(&connection()).is_ok());

        let mut model = connection();
        model.api_key = None;
        assert!(validate(&model).is_err());

        let mut model = connection();
        model.auth_type = AUTH_CUSTOM_KEYS.into();
        assert!(validate(&model).is_err());
        model.api_key = None;
        model.custom_keys = BTreeMap::from([("x-key".to_string(), "v".to_string())]);
        assert!(validate(&model).is_ok());

        let mut model = connection();
        model.auth_type = AUTH_AAD.into();
        assert!(validate(&model).is_err());
        model.api_key = None;
        assert!(validate(&model).is_ok());

        let mut model = connection();
        model.auth_type = "Basic".into();
        assert!(validate(&model).is_err());
    }

    #[test]
    fn parent_may_be_account_or_project() {
        let mut model = connection();
        model.parent_id = account_id().to_string();
        assert!(validate(&model).is_ok());

        model.parent_id = "/subscriptions/x/resourceGroups/rg".into();
        assert!(validate(&model).is_err());
    }

    #[test]
    fn flatten_keeps_secrets_from_prior_state() {
        let body: Connection = serde_json::from_value(connection_body()).unwrap();

        let with_prior = flatten(&connection_id(), &body, Some(&connection()));
        assert_eq!(with_prior, connection());

        let imported = flatten(&connection_id(), &body, None);
        assert!(imported.api_key.is_none());
        assert_eq!(imported.parent_id, project_id().to_string());
    }

    #[test]
    fn expand_sends_only_matching_credentials() {
        let json = serde_json::to_value(expand(&connection())).unwrap();
        assert_eq!(json["properties"]["credentials"], serde_json::json!({"key": "secret"}));

        let mut model = connection();
        model.auth_type = AUTH_NONE.into();
        model.api_key = None;
        let json = serde_json::to_value(expand(&model)).unwrap();
        assert!(json["properties"].get("credentials").is_none());
    }

    #[tokio::test]
    async fn create_puts_credentials_and_reads_back_state() {
        let server = MockServer::start().await;
        let connection_path = connection_id().to_string();

        Mock::given(method("GET"))
            .and(path(connection_path.as_str()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(connection_path.as_str()))
            .and(body_partial_json(serde_json::json!({
                "properties": {
                    "authType": "ApiKey",
                    "credentials": {"key": "secret"},
                    "isSharedToAll": false
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(connection_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(connection_body()))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynResource::create(
            &ConnectionResource,
            &ctx,
            serde_json::to_value(connection()).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(state["id"], connection_path);
        assert_eq!(state["api_key"], "secret");
        assert_eq!(state["metadata"]["ApiType"], "Azure");
    }

    #[tokio::test]
    async fn import_of_account_connection() {
        let server = MockServer::start().await;
        let id = ConnectionId::under(&account_id().to_string(), "search").unwrap();
        Mock::given(method("GET"))
            .and(path(id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "properties": {
                    "authType": "AAD",
                    "category": "CognitiveSearch",
                    "target": "https://search.windows.net/",
                    "isSharedToAll": true
                }
            })))
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynResource::import(&ConnectionResource, &ctx, &id.to_string())
            .await
            .unwrap();

        assert_eq!(state["parent_id"], account_id().to_string());
        assert_eq!(state["shared_to_all"], true);
        assert!(state["api_key"].is_null());
    }

    #[tokio::test]
    async fn delete_sends_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(connection_id().to_string()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        ResourceAdapter::delete(&ConnectionResource, &ctx, &connection_id())
            .await
            .unwrap();
    }
}
