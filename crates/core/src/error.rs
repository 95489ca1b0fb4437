//! Error types for kvdemo operations.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for kvdemo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed local configuration.
    Configuration,
    /// Token exchange failed.
    Authentication,
    /// A vault, key or secret request failed.
    Service,
}

/// Errors that can occur while running the vault walkthrough.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Credentials or options could not be loaded.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(kvdemo::configuration),
        help(
            "Set AZURE_AUTH_LOCATION to a JSON file with clientId, tenantId, clientSecret and subscriptionId (see `az ad sp create-for-rbac --sdk-auth`)"
        )
    )]
    Configuration {
        /// The error message
        message: String,
    },

    /// The identity provider rejected the credentials or could not be reached.
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(kvdemo::authentication),
        help("Check that the client secret is valid and has not expired")
    )]
    Authentication {
        /// The error message
        message: String,
    },

    /// A management or data-plane request failed.
    #[error("{operation} failed: {message}")]
    #[diagnostic(code(kvdemo::service))]
    Service {
        /// The operation that failed, e.g. `create vault`
        operation: String,
        /// HTTP status, when the failure came from a response
        status: Option<u16>,
        /// The service's error text
        message: String,
    },
}

impl Error {
    /// Create a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a new service error without an HTTP status.
    #[must_use]
    pub fn service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            operation: operation.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a new service error carrying the response status.
    #[must_use]
    pub fn service_status(
        operation: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            operation: operation.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Service { .. } => ErrorKind::Service,
        }
    }

    /// HTTP status of a service error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => *status,
            _ => None,
        }
    }
}
