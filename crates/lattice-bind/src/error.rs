//! Error types for the binding manager.

use thiserror::Error;

/// Errors raised by [`ListView`](crate::ListView) operations.
///
/// Every variant except [`BindError::Host`] is a contract violation by the
/// caller and is never retried.
#[derive(Debug, Error)]
pub enum BindError {
    /// No association exists for the model.
    #[error("no view is bound to model {model}")]
    NotFound {
        /// Debug rendering of the model.
        model: String,
    },

    /// The view is not parented under this manager's container.
    #[error("view {view} is not a child of this list")]
    NotAChild {
        /// Debug rendering of the view handle.
        view: String,
    },

    /// The view is a child of the container but not tracked by this manager.
    #[error("view {view} is not tracked by this list")]
    NotTracked {
        /// Debug rendering of the view handle.
        view: String,
    },

    /// The bound model has a different type than the one requested.
    #[error("view {view} is bound to a {actual}, not a {expected}")]
    TypeMismatch {
        /// Debug rendering of the view handle.
        view: String,
        /// The requested model type.
        expected: &'static str,
        /// The stored model type.
        actual: &'static str,
    },

    /// The model is already bound and the list rejects duplicates.
    #[error("model {model} is already bound")]
    DuplicateModel {
        /// Debug rendering of the model.
        model: String,
    },

    /// The host failed to perform a view operation.
    #[error("host operation failed: {0}")]
    Host(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BindError {
    /// Wrap a host error.
    pub fn host<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Host(Box::new(error))
    }
}

/// Result type for binding operations.
pub type BindResult<T> = std::result::Result<T, BindError>;
