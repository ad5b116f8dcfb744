//! Error taxonomy for resource lifecycle operations.

use std::time::Duration;
use thiserror::Error;

use crate::types::Operation;

/// Result type alias using `ResourceError`.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Boxed error used as the source of remote failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification every remote client error must provide.
///
/// A 404 from the directory is the only status that carries domain meaning
/// (absence); everything else is fatal to the operation.
pub trait RemoteFailure: std::error::Error + Send + Sync + 'static {
    /// Returns true if the remote reported that the addressed object does
    /// not exist.
    fn is_not_found(&self) -> bool;
}

/// Errors returned to the host by lifecycle operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Malformed identifiers or conflicting attributes, detected before any
    /// lock is taken or remote call is issued.
    #[error("validating {resource_type}: {message}")]
    Validation {
        resource_type: String,
        message: String,
    },

    /// The relationship is already present remotely.
    #[error(
        "a resource with the ID {id:?} already exists - to be managed via Terraform this resource \
         needs to be imported into the State. Please see the resource documentation for \
         {resource_type:?} for more information"
    )]
    AlreadyExists { resource_type: String, id: String },

    /// The resource vanished while an operation that needs it was running.
    #[error("{operation} {id}: the resource no longer exists")]
    Gone { operation: Operation, id: String },

    /// Transport, HTTP or decoding failure from the remote directory.
    #[error("{operation} {id}: {source}")]
    Remote {
        operation: Operation,
        id: String,
        #[source]
        source: BoxError,
    },

    /// The operation did not finish before its deadline.
    #[error("{operation} {id}: timed out after {after:?}")]
    Timeout {
        operation: Operation,
        id: String,
        after: Duration,
    },

    /// Update was requested on a resource whose attributes all force
    /// replacement.
    #[error("{resource_type} does not support in-place updates")]
    UpdateNotSupported { resource_type: String },
}

impl ResourceError {
    /// Builds a validation error.
    pub fn validation(resource_type: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            resource_type: resource_type.to_string(),
            message: message.into(),
        }
    }

    /// Wraps a remote failure with the operation and identifier it belongs to.
    pub fn remote<E>(operation: Operation, id: impl ToString, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Remote {
            operation,
            id: id.to_string(),
            source: source.into(),
        }
    }

    /// Returns true if the host should tell the user to import the resource.
    #[must_use]
    pub fn requires_import(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns true for input errors detected before any remote call.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
