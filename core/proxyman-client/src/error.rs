//! Error types for the control client.
//!
//! Every remote call made by [`Proxyman`](crate::Proxyman) reports failure as
//! a [`RelatedError`], whatever channel produced it. The channel's own error
//! stays reachable as the source.

use std::error::Error as StdError;
use thiserror::Error;

/// Boxed transport error carried as a cause.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Result type for control client operations.
pub type ProxymanResult<T> = Result<T, RelatedError>;

/// Alias naming the error by its role at the client boundary.
pub type RemoteOperationError = RelatedError;

/// A remote call to the engine failed.
#[derive(Debug, Error)]
#[error("{procedure} failed")]
pub struct RelatedError {
    procedure: &'static str,
    #[source]
    source: BoxError,
}

impl RelatedError {
    /// Wraps a transport error raised by `procedure`.
    pub fn new<E>(procedure: &'static str, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            procedure,
            source: source.into(),
        }
    }

    /// The remote procedure that failed, e.g. `AlterInbound`.
    pub fn procedure(&self) -> &'static str {
        self.procedure
    }

    /// The transport error that caused this failure.
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// Returns the cause as `E` if that is its concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    /// Consumes the error, returning the cause.
    pub fn into_cause(self) -> BoxError {
        self.source
    }
}
