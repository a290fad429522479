//! Error types for the HashiCups provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Detail shown when an operation runs before `configure` installed a client.
pub const NOT_CONFIGURED_DETAIL: &str = "The provider hasn't been configured before apply, \
     likely because it depends on an unknown value from another resource.";

/// Errors raised by provider callbacks.
///
/// Every error is terminal for the callback that produced it. The driver
/// turns it into a single error [`Diagnostic`] via [`ProviderError::to_diagnostic`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An operation needed the API client before the provider was configured.
    #[error("Provider not configured")]
    NotConfigured,

    /// The HashiCups API call failed.
    #[error("{summary}: {detail}")]
    Api {
        /// Short, user-facing summary such as "Error creating order".
        summary: String,
        /// The underlying cause, with context.
        detail: String,
    },

    /// The state handed over by the host is missing something we rely on.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binding the listener or another I/O step of the server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl ProviderError {
    /// Build an upstream API error with a summary and a detail message.
    pub fn api(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Api {
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// Convert the error into the diagnostic shown to the user.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::NotConfigured => {
                Diagnostic::error("Provider not configured").with_detail(NOT_CONFIGURED_DETAIL)
            }
            Self::Api { summary, detail } => {
                Diagnostic::error(summary.clone()).with_detail(detail.clone())
            }
            other => Diagnostic::error(other.to_string()),
        }
    }
}
