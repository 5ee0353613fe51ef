//! Commitment plans (`azurerm_cognitive_account_commitment_plan`).
//!
//! A commitment plan buys a fixed quota tier for an account, optionally
//! renewing into a different tier at the end of the term.

use async_trait::async_trait;
use azure_cognitive_core::client::ArmClient;
use azure_cognitive_core::error::{not_found_to_none, ProviderError, ProviderResult};
use azure_cognitive_core::ids::{AccountId, CommitmentPlanId};
use azure_cognitive_core::locks;
use azure_cognitive_core::lro;
use azure_cognitive_core::resource::{ensure_absent, ResourceAdapter, ResourceContext};
use azure_cognitive_core::schema::{Attribute, AttributeType, Schema};
use azure_cognitive_core::validate;
use serde::{Deserialize, Serialize};

use crate::account;
use crate::models::API_VERSION;

/// Host-facing type name.
pub const RESOURCE_TYPE: &str = "azurerm_cognitive_account_commitment_plan";

pub const HOSTING_MODELS: &[&str] = &[
    "Web",
    "ConnectedContainer",
    "DisconnectedContainer",
    "ProvisionedWeb",
];

/// A `Microsoft.CognitiveServices/accounts/commitmentPlans` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPlanPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: CommitmentPlanProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPlanProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosting_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CommitmentPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<CommitmentPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment_plan_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPeriod {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

/// Declarative state of a commitment plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitmentPlan {
    pub name: String,
    pub cognitive_account_id: String,
    pub hosting_model: String,
    pub plan_type: String,
    pub current_tier: Option<String>,
    pub current_count: Option<i64>,
    pub auto_renew: bool,
    pub next_tier: Option<String>,
    pub next_count: Option<i64>,

    pub commitment_plan_guid: Option<String>,
}

pub fn schema() -> Schema {
    Schema::new()
        .attribute("name", Attribute::required_string().force_new())
        .attribute("cognitive_account_id", Attribute::required_string().force_new())
        .attribute("hosting_model", Attribute::required_string().force_new())
        .attribute("plan_type", Attribute::required_string().force_new())
        .attribute("current_tier", Attribute::optional_string())
        .attribute("current_count", Attribute::optional(AttributeType::Int))
        .attribute("auto_renew", Attribute::optional_bool().default_value(false))
        .attribute("next_tier", Attribute::optional_string())
        .attribute("next_count", Attribute::optional(AttributeType::Int))
        .attribute("commitment_plan_guid", Attribute::computed_string())
}

pub fn validate(model: &CommitmentPlan) -> ProviderResult<()> {
    validate::child_name("name", &model.name)?;
    model.cognitive_account_id.parse::<AccountId>()?;
    validate::one_of("hosting_model", &model.hosting_model, HOSTING_MODELS)?;
    validate::not_empty("plan_type", &model.plan_type)?;

    for (field, count) in [
        ("current_count", model.current_count),
        ("next_count", model.next_count),
    ] {
        if count.is_some_and(|c| c < 0) {
            return Err(ProviderError::Validation(format!(
                "{field} cannot be negative"
            )));
        }
    }
    if model.next_count.is_some() && model.next_tier.is_none() {
        return Err(ProviderError::Validation(
            "`next_count` requires `next_tier`".into(),
        ));
    }
    Ok(())
}

fn period(tier: &Option<String>, count: Option<i64>) -> Option<CommitmentPeriod> {
    (tier.is_some() || count.is_some()).then(|| CommitmentPeriod {
        tier: tier.clone(),
        count,
    })
}

pub fn expand(model: &CommitmentPlan) -> CommitmentPlanPayload {
    CommitmentPlanPayload {
        id: None,
        properties: CommitmentPlanProperties {
            hosting_model: Some(model.hosting_model.clone()),
            plan_type: Some(model.plan_type.clone()),
            current: period(&model.current_tier, model.current_count),
            auto_renew: Some(model.auto_renew),
            next: period(&model.next_tier, model.next_count),
            ..CommitmentPlanProperties::default()
        },
    }
}

pub fn flatten(id: &CommitmentPlanId, payload: &CommitmentPlanPayload) -> CommitmentPlan {
    let props = &payload.properties;
    let current = props.current.clone().unwrap_or_default();
    let next = props.next.clone().unwrap_or_default();

    CommitmentPlan {
        name: id.name.clone(),
        cognitive_account_id: id.account.to_string(),
        hosting_model: props.hosting_model.clone().unwrap_or_default(),
        plan_type: props.plan_type.clone().unwrap_or_default(),
        current_tier: current.tier,
        current_count: current.count,
        auto_renew: props.auto_renew.unwrap_or_default(),
        next_tier: next.tier,
        next_count: next.count,
        commitment_plan_guid: props.commitment_plan_guid.clone(),
    }
}

fn plan_path(id: &CommitmentPlanId) -> String {
    format!("{id}?{API_VERSION}")
}

/// Get a commitment plan.
///
/// # Tracing
///
/// Emits a span named `cognitive::commitment_plans::get` with fields
/// `account` and `plan`.
#[tracing::instrument(
    name = "cognitive::commitment_plans::get",
    skip(client),
    fields(account = %id.account.account_name, plan = %id.name)
)]
pub async fn get(client: &ArmClient, id: &CommitmentPlanId) -> ProviderResult<CommitmentPlanPayload> {
    tracing::debug!("getting commitment plan");

    let response = client.get(&plan_path(id)).await?;
    Ok(response.json::<CommitmentPlanPayload>().await?)
}

/// Create or replace a commitment plan.
///
/// # Tracing
///
/// Emits a span named `cognitive::commitment_plans::create_or_update` with fields
/// `account` and `plan`.
#[tracing::instrument(
    name = "cognitive::commitment_plans::create_or_update",
    skip(client, plan),
    fields(account = %id.account.account_name, plan = %id.name)
)]
pub async fn create_or_update(
    client: &ArmClient,
    id: &CommitmentPlanId,
    plan: &CommitmentPlanPayload,
) -> ProviderResult<()> {
    tracing::debug!("writing commitment plan");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let path = plan_path(id);
    let response = client.put(&path, plan).await?;
    lro::wait_for_completion(client, response).await?;
    lro::wait_for_provisioning_state(client, &path).await?;

    tracing::debug!("commitment plan written");
    Ok(())
}

/// Delete a commitment plan.
///
/// # Tracing
///
/// Emits a span named `cognitive::commitment_plans::delete` with fields
/// `account` and `plan`.
#[tracing::instrument(
    name = "cognitive::commitment_plans::delete",
    skip(client),
    fields(account = %id.account.account_name, plan = %id.name)
)]
pub async fn delete(client: &ArmClient, id: &CommitmentPlanId) -> ProviderResult<()> {
    tracing::debug!("deleting commitment plan");

    let _lock = locks::lock_by_name(&id.account.account_name, account::RESOURCE_TYPE).await;
    let response = client.delete(&plan_path(id)).await?;
    lro::wait_for_completion(client, response).await?;

    tracing::debug!("commitment plan deleted");
    Ok(())
}

/// Adapter for `azurerm_cognitive_account_commitment_plan`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitmentPlanResource;

#[async_trait]
impl ResourceAdapter for CommitmentPlanResource {
    type Model = CommitmentPlan;
    type Id = CommitmentPlanId;

    fn type_name(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema()
    }

    fn validate(&self, model: &CommitmentPlan) -> ProviderResult<()> {
        validate(model)
    }

    async fn create(&self, ctx: &ResourceContext, model: &CommitmentPlan) -> ProviderResult<CommitmentPlanId> {
        let id = CommitmentPlanId::new(model.cognitive_account_id.parse()?, &model.name);
        ensure_absent(RESOURCE_TYPE, &id, get(&ctx.client, &id)).await?;

        create_or_update(&ctx.client, &id, &expand(model)).await?;
        Ok(id)
    }

    async fn read(
        &self,
        ctx: &ResourceContext,
        id: &CommitmentPlanId,
        _prior: Option<&CommitmentPlan>,
    ) -> ProviderResult<Option<CommitmentPlan>> {
        let current = not_found_to_none(get(&ctx.client, id).await)?;
        Ok(current.map(|payload| flatten(id, &payload)))
    }

    async fn update(
        &self,
        ctx: &ResourceContext,
        id: &CommitmentPlanId,
        _prior: &CommitmentPlan,
        model: &CommitmentPlan,
    ) -> ProviderResult<()> {
        create_or_update(&ctx.client, id, &expand(model)).await
    }

    async fn delete(&self, ctx: &ResourceContext, id: &CommitmentPlanId) -> ProviderResult<()> {
        delete(&ctx.client, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{account_id, account_path, setup_context};
    use azure_cognitive_core::resource::DynResource;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn plan_id() -> CommitmentPlanId {
        CommitmentPlanId::new(account_id(), "plan1")
    }

    fn plan() -> CommitmentPlan {
        CommitmentPlan {
            name: "plan1".into(),
            cognitive_account_id: account_path(),
            hosting_model: "Web".into(),
            plan_type: "TextAnalytics".into(),
            current_tier: Some("T1".into()),
            current_count: Some(1),
            auto_renew: true,
            ..CommitmentPlan::default()
        }
    }

    fn plan_body() -> serde_json::Value {
        serde_json::json!({
            "id": plan_id().to_string(),
            "properties": {
                "hostingModel": "Web",
                "planType": "TextAnalytics",
                "current": {"tier": "T1", "count": 1, "quota": {"quantity": 1000}},
                "autoRenew": true,
                "commitmentPlanGuid": "7b3e1c2e-0000-0000-0000-000000000000",
                "provisioningState": "Succeeded"
            }
        })
    }

    #[test]
    fn validation() {
        assert!(validate(&plan()).is_ok());

        let mut model = plan();
        model.hosting_model = "Cloud".into();
        assert!(validate(&model).is_err());

        let mut model = plan();
        model.next_count = Some(2);
        assert!(validate(&model).is_err());
        model.next_tier = Some("T2".into());
        assert!(validate(&model).is_ok());

        let mut model = plan();
        model.current_count = Some(-1);
        assert!(validate(&model).is_err());
    }

    #[test]
    fn expand_omits_empty_next_period() {
        let json = serde_json::to_value(expand(&plan())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "properties": {
                    "hostingModel": "Web",
                    "planType": "TextAnalytics",
                    "current": {"tier": "T1", "count": 1},
                    "autoRenew": true
                }
            })
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn lifecycle() {
        let server = MockServer::start().await;
        let plan_path = plan_id().to_string();

        Mock::given(method("GET"))
            .and(path(plan_path.as_str()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(plan_path.as_str()))
            .and(body_json(serde_json::to_value(expand(&plan())).unwrap()))
            .respond_with(ResponseTemplate::new(200).set_body_json(plan_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(plan_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(plan_body()))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(plan_path.as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = setup_context(&server).await;
        let state = DynResource::create(
            &CommitmentPlanResource,
            &ctx,
            serde_json::to_value(plan()).unwrap(),
        )
        .await
        .unwrap();
        assert_eq!(state["commitment_plan_guid"], "7b3e1c2e-0000-0000-0000-000000000000");
        assert_eq!(state["current_tier"], "T1");

        DynResource::delete(&CommitmentPlanResource, &ctx, state)
            .await
            .unwrap();

        assert!(logs_contain("cognitive::commitment_plans::create_or_update"));
        assert!(logs_contain("cognitive::commitment_plans::delete"));
    }
}
