//! Credentials for Azure Resource Manager.
//!
//! ARM only accepts Microsoft Entra ID bearer tokens. [`ArmCredential`] either
//! wraps an `azure_core` [`TokenCredential`] (Azure CLI, client secret,
//! managed identity, ...) or carries a pre-acquired token, which is mostly
//! useful in tests and CI pipelines that mint tokens out of band.

use std::sync::Arc;

use azure_core::credentials::TokenCredential;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{ProviderError, ProviderResult};

/// Environment variable holding a pre-acquired ARM access token.
pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

/// Credential types supported by the ARM client.
#[derive(Clone)]
pub enum ArmCredential {
    /// A bearer token acquired elsewhere.
    Static(SecretString),

    /// Any `azure_core` token credential.
    Token(Arc<dyn TokenCredential>),
}

impl ArmCredential {
    /// Create a credential from the environment.
    ///
    /// Uses `ARM_ACCESS_TOKEN` when set, otherwise falls back to the Azure CLI.
    pub fn from_env() -> ProviderResult<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.is_empty() => Ok(Self::Static(SecretString::from(token))),
            _ => Self::azure_cli(),
        }
    }

    /// Create a credential from a pre-acquired bearer token.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::Static(SecretString::from(token.into()))
    }

    /// Create a credential backed by `az account get-access-token`.
    pub fn azure_cli() -> ProviderResult<Self> {
        let credential = azure_identity::AzureCliCredential::new(None)
            .map_err(|e| ProviderError::Auth(e.to_string()))?;
        Ok(Self::Token(credential))
    }

    /// Wrap an arbitrary `azure_core` token credential.
    pub fn token_credential(credential: Arc<dyn TokenCredential>) -> Self {
        Self::Token(credential)
    }

    /// Resolve the credential to an `Authorization` header value for `scope`.
    pub async fn resolve(&self, scope: &str) -> ProviderResult<String> {
        match self {
            Self::Static(token) => Ok(format!("Bearer {}", token.expose_secret())),
            Self::Token(credential) => {
                let token = credential
                    .get_token(&[scope], None)
                    .await
                    .map_err(|e| ProviderError::Auth(e.to_string()))?;
                Ok(format!("Bearer {}", token.token.secret()))
            }
        }
    }
}

impl std::fmt::Debug for ArmCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => write!(f, "ArmCredential::Static(****)"),
            Self::Token(_) => write!(f, "ArmCredential::Token"),
        }
    }
}
