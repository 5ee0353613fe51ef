//! Provider-level behaviour switches (the `features` block).

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// All feature switches the Cognitive Services adapters consult.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderFeatures {
    pub cognitive_account: CognitiveAccountFeatures,
}

/// Behaviour of `cognitive_account`-family resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitiveAccountFeatures {
    /// Purge the soft-deleted account after destroy so the name is free again.
    #[serde(default = "default_true")]
    pub purge_soft_delete_on_destroy: bool,
}

impl Default for CognitiveAccountFeatures {
    fn default() -> Self {
        Self {
            purge_soft_delete_on_destroy: true,
        }
    }
}
