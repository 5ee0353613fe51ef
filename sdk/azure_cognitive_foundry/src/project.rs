//! AI Foundry projects (`azurerm_cognitive_account_project`).
//!
//! Projects are child resources of an `AIServices` account. Writes hold the
//! parent account's named lock because ARM rejects concurrent changes to an
//! account and its children.

use std::collections::BTreeMap;

use async_trait::async_trait;
use azure_cognitive_accounts::account;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderResult};
use azure_cognitive_core::ids::{AccountId, ProjectId};
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::models::{
    cleared, expand_identity, expand_identity_or_none, flatten_identity, normalize_location,
    single_block, tags_attribute, validate_tags, Identity, Tags,
};
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::models::{Project, ProjectProperties, API_VERSION};

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_project";

/// Declarative state of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitiveProject {
    pub name: String,
    pub cognitive_account_id: String,
    pub location: String,
    #[serde(deserialize_with = "single_block")]
    pub identity: Option<Identity>,
    pub description: Option<String>,
    pub display_name: Option<String>,
    pub tags: Tags,

    /// Computed: service endpoints keyed by name.
    pub endpoints: BTreeMap<String, String>,
    /// Computed: whether this is the account's default project.
    pub default: bool,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("cognitive_account_id", Attribute::required_string().force_new())
        .attribute("location", Attribute::required_string().force_new())
        .block("identity", Identity::schema_block())
        .attribute("description", Attribute::optional_string())
        .attribute("display_name", Attribute::optional_string())
        .attribute("tags", tags_attribute())
        .attribute(
            "endpoints",
            Attribute::computed(AttributeType::Map(Box::new(AttributeType::String))),
        )
        .attribute("default", Attribute::computed(AttributeType::Bool))
}

pub fn validate(model: &CognitiveProject) -> ProviderResult<()> {
    validate::child_name("name", &model.name)?;
    model.cognitive_account_id.parse::<AccountId>()?;
    validate::not_empty("location", &model.location)?;
    if let Some(identity) = &model.identity {
        identity.validate()?;
    }
    if let Some(display_name) = &model.display_name {
        validate::not_empty("display_name", display_name)?;
    }
    validate_tags(&model.tags)
}

pub fn expand(model: &CognitiveProject) -> Project {
    Project {
        location: Some(normalize_location(&model.location)),
        identity: expand_identity(model.identity.as_ref()),
        tags: Some(model.tags.clone()),
        properties: ProjectProperties {
            description: model.description.clone(),
            display_name: model.display_name.clone(),
            ..ProjectProperties::default()
        },
        ..Project::default()
    }
}

/// PATCH body for a change from `prior` to `model`.
///
/// Location is immutable and left out. A removed identity is sent as type
/// `None` and removed strings as empty values, since ARM keeps whatever a
/// PATCH omits.
pub fn expand_patch(prior: &CognitiveProject, model: &CognitiveProject) -> Project {
    let mut patch = expand(model);
    patch.location = None;
    patch.identity = Some(expand_identity_or_none(model.identity.as_ref()));
    patch.properties.description = cleared(model.description.clone(), &prior.description);
    patch.properties.display_name = cleared(model.display_name.clone(), &prior.display_name);
    patch
}

pub fn flatten(id: &ProjectId, project: &Project) -> CognitiveProject {
    let props = &project.properties;
    CognitiveProject {
        name: id.name.clone(),
        cognitive_account_id: id.account.to_string(),
        location: project
            .location
            .as_deref()
            .map(normalize_location)
            .unwrap_or_default(),
        identity: flatten_identity(project.identity.as_ref()),
        description: props.description.clone().filter(|d| !d.is_empty()),
        display_name: props.display_name.clone().filter(|d| !d.is_empty()),
        tags: project.tags.clone().unwrap_or_default(),
        endpoints: props.endpoints.clone().unwrap_or_default(),
        default: props.is_default.unwrap_or_default(),
    }
}

fn project_path(id: &ProjectId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get a project.
///
/// # Tracing
///
/// Emits a span named `cognitive::projects::get` with fields `account` and
/// `project`.
#[tracing::instrument(
    name = "cognitive::projects::get",
    skip(client),
    fields(account = %id.account.account_name, project = %id.name)
)]
pub async fn get(client: &ArmClient, id: &ProjectId) -> ProviderResult<Project> {
    tracing::debug!("getting project");

    let response = client.get(&project_path(id)).await?;
    let project = response.json::<Project>().await?;

    Ok(project)
}

/// Create a project and wait for it to be provisioned.
///
/// # Tracing
///
/// Emits a span named `cognitive::projects::create` with fields `account`
/// and `project`.
#[tracing::instrument(
    name = "cognitive::projects::create",
    skip(client, project),
    fields(account = %id.account.account_name, project = %id.name)
)]
pub async fn create(client: &ArmClient, id: &ProjectId, project: &Project) -> ProviderResult<Project> {
    tracing::debug!("creating project");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let path = project_path(id);
    let response = client.put(&path, project).await?;
    lro::wait_for_completion(client, response).await?;
    let body = lro::wait_for_provisioning_state(client, &path).await?;

    tracing::debug!("project created");
    Ok(serde_json::from_value(body)?)
}

/// Patch a project and wait until it is provisioned again.
///
/// # Tracing
///
/// Emits a span named `cognitive::projects::update` with fields `account`
/// and `project`.
#[tracing::instrument(
    name = "cognitive::projects::update",
    skip(client, project),
    fields(account = %id.account.account_name, project = %id.name)
)]
pub async fn update(client: &ArmClient, id: &ProjectId, project: &Project) -> ProviderResult<Project> {
    tracing::debug!("updating project");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let path = project_path(id);
    let response = client.patch(&path, project).await?;
    lro::wait_for_completion(client, response).await?;
    let body = lro::wait_for_provisioning_state(client, &path).await?;

    tracing::debug!("project updated");
    Ok(serde_json::from_value(body)?)
}

/// Delete a project.
///
/// # Tracing
///
/// Emits a span named `cognitive::projects::delete` with fields `account`
/// and `project`.
#[tracing::instrument(
    name = "cognitive::projects::delete",
    skip(client),
    fields(account = %id.account.account_name, project = %id.name)
)]
pub async fn delete(client: &ArmClient, id: &ProjectId) -> ProviderResult<()> {
    tracing::debug!("deleting project");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&project_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("project deleted");
    Ok(())
}

/// Adapter for `azurerm_cognitive_account_project`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectResource;

#[async_trait]
impl ResourceAdapter for ProjectResource {
    type Model = CognitiveProject;
    type Id = ProjectId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CognitiveProject) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(&self, ctx: &ResourceContext, model: &CognitiveProject) -> ProviderResult<ProjectId> {
        let id = ProjectId::new(model.cognitive_account_id.parse()?, &model.name);
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &ProjectId,
        _prior: Option<&CognitiveProject>,
    ) -> ProviderResult<Option<CognitiveProject>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|project| flatten(id, &project)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &ProjectId,
        prior: &CognitiveProject,
        model: &CognitiveProject,
    ) -> ProviderResult<()> {
        update(&ctx.client, id, &expand_patch(prior, model)).await?;
        Ok(())
    }

    async fn delete(&self, ctx: &ResourceContext, id: &ProjectId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}
