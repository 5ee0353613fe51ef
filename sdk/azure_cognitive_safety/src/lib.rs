//! # Azure Cognitive Services content safety
//!
//! Responsible AI policies and blocklists attached to a Cognitive Services
//! account. All writes hold the parent account's named lock.
//!
//! ## Modules
//!
//! - [`rai_policy`] - `azurerm_cognitive_account_rai_policy`
//! - [`rai_blocklist`] - `azurerm_cognitive_account_rai_blocklist`
//! - [`rai_blocklist_item`] - `azurerm_cognitive_account_rai_blocklist_item`

pub mod models;
pub mod rai_blocklist;
pub mod rai_blocklist_item;
pub mod rai_policy;
