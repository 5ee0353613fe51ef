//! # Azure Cognitive Services accounts
//!
//! Account-family resources for the Azure Cognitive Services provider.
//!
//! Every module pairs raw ARM calls (free `async fn`s taking an
//! [`ArmClient`](azure_cognitive_core::client::ArmClient)) with a resource
//! adapter implementing
//! [`ResourceAdapter`](azure_cognitive_core::resource::ResourceAdapter).
//!
//! ## Modules
//!
//! - [`account`] - `azurerm_cognitive_account`
//! - [`ai_services`] - `azurerm_ai_services`
//! - [`customer_managed_key`] - `azurerm_cognitive_account_customer_managed_key`
//! - [`deployment`] - `azurerm_cognitive_deployment`
//! - [`commitment_plan`] - `azurerm_cognitive_account_commitment_plan`
//! - [`data_source`] - account and deployment data sources

pub mod account;
pub mod ai_services;
pub mod commitment_plan;
pub mod customer_managed_key;
pub mod data_source;
pub mod deployment;
pub mod models;

/// Test utilities shared across modules.
#[cfg(test)]
pub(crate) mod test_utils {
    use azure_cognitive_core::ids::AccountId;
    use azure_cognitive_core::test_support::TEST_SUBSCRIPTION;

    pub use azure_cognitive_core::test_support::{setup_context, setup_mock_client};

    /// The account every test resource lives under.
    pub fn account_id() -> AccountId {
        AccountId::new(TEST_SUBSCRIPTION, "rg", "acct")
    }

    /// Request path of [`account_id`].
    pub fn account_path() -> String {
        account_id().to_string()
    }

    /// A provisioned account as ARM returns it.
    pub fn account_body(kind: &str) -> serde_json::Value {
        serde_json::json!({
            "id": account_path(),
            "name": "acct",
            "type": "Microsoft.CognitiveServices/accounts",
            "kind": kind,
            "location": "westeurope",
            "sku": {"name": "S0"},
            "tags": {"env": "test"},
            "properties": {
                "customSubDomainName": "contoso-ai",
                "endpoint": "https://acct.cognitiveservices.azure.com/",
                "provisioningState": "Succeeded",
                "publicNetworkAccess": "Enabled"
            }
        })
    }
}
