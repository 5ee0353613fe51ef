//! # Azure AI Foundry resources
//!
//! Projects and connections hosted by a Cognitive Services account of kind
//! `AIServices`.
//!
//! ## Modules
//!
//! - [`project`] - `azurerm_cognitive_account_project`
//! - [`connection`] - account and project connections

pub mod connection;
pub mod models;
pub mod project;

#[cfg(test)]
pub(crate) mod test_utils {
    use azure_cognitive_core::ids::{AccountId, ProjectId};
    use azure_cognitive_core::test_support::TEST_SUBSCRIPTION;

    pub use azure_cognitive_core::test_support::setup_context;

    pub fn account_id() -> AccountId {
        AccountId::new(TEST_SUBSCRIPTION, "rg", "hub")
    }

    pub fn project_id() -> ProjectId {
        ProjectId::new(account_id(), "research")
    }
}
