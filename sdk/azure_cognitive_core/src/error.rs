use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while managing Cognitive Services resources.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request failed due to an HTTP error.
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP request failed at the transport level.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint URL is invalid.
    #[error("Invalid endpoint URL: {message}")]
    InvalidEndpoint {
        message: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// A required configuration value is missing.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// ARM returned an error envelope (`{"error": {"code", "message"}}`).
    #[error("API error ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A resource ID did not have the expected shape.
    #[error("parsing {kind} ID {input:?}: {reason}")]
    InvalidResourceId {
        kind: &'static str,
        input: String,
        reason: String,
    },

    /// Configuration failed argument validation.
    #[error("{0}")]
    Validation(String),

    /// Create was attempted over a resource that already exists remotely.
    #[error(
        "A resource with the ID {id:?} already exists - to be managed via Terraform this \
         resource needs to be imported into the State. Please see the resource documentation \
         for {resource_type} for more information"
    )]
    AlreadyExists { resource_type: String, id: String },

    /// The resource does not exist.
    #[error("{0} was not found")]
    NotFound(String),

    /// A long-running operation finished in a non-successful state.
    #[error("operation finished with status {status:?}: {message}")]
    OperationFailed { status: String, message: String },

    /// The host named a resource or data source type that is not registered.
    #[error("the provider does not support {kind} {name:?}")]
    UnsupportedType { kind: &'static str, name: String },

    /// An operation did not finish within its timeout.
    #[error("{operation} did not complete within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Build an [`ProviderError::Http`] error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Build an [`ProviderError::InvalidEndpoint`] error carrying the parse failure.
    pub fn invalid_endpoint_with_source(message: impl Into<String>, source: url::ParseError) -> Self {
        Self::InvalidEndpoint {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Build an [`ProviderError::InvalidResourceId`] error.
    pub fn invalid_id(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResourceId {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// The HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error represents an HTTP 404 from ARM.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Map an ARM 404 to `Ok(None)`, leaving every other outcome unchanged.
pub fn not_found_to_none<T>(result: ProviderResult<T>) -> ProviderResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_to_none_only_swallows_404() {
        assert_eq!(not_found_to_none(Ok(1)).unwrap(), Some(1));
        assert!(not_found_to_none::<()>(Err(ProviderError::http(404, "")))
            .unwrap()
            .is_none());
        assert!(not_found_to_none::<()>(Err(ProviderError::http(409, ""))).is_err());
    }

    #[test]
    fn not_found_detected_for_http_and_api_errors() {
        assert!(ProviderError::http(404, "gone").is_not_found());
        assert!(ProviderError::Api {
            status: 404,
            code: "ResourceNotFound".into(),
            message: "missing".into(),
        }
        .is_not_found());
        assert!(!ProviderError::http(409, "conflict").is_not_found());
        assert!(!ProviderError::Auth("nope".into()).is_not_found());
    }

    #[test]
    fn already_exists_mentions_import() {
        let err = ProviderError::AlreadyExists {
            resource_type: "azurerm_cognitive_account".into(),
            id: "/subscriptions/x".into(),
        };
        let text = err.to_string();
        assert!(text.contains("needs to be imported"));
        assert!(text.contains("azurerm_cognitive_account"));
    }

    #[test]
    fn invalid_id_formats_kind_and_input() {
        let err = ProviderError::invalid_id("Account", "/bad", "too short");
        assert_eq!(err.to_string(), "parsing Account ID \"/bad\": too short");
    }
}
