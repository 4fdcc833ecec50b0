//! Error types for the metaobject core.

use thiserror::Error;

/// Result alias used throughout the core and by method bodies.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by construction, inclusion and dispatch.
///
/// Structural errors (`Definition`, `Resolution`) are raised at the call that
/// would break an invariant. `MethodMissing` is the outcome of a dispatch that
/// found no implementation. Anything a method body raises travels as
/// `Raised` and is never interpreted by the core.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid superclass, superclass cycle, or a class used as a mixin
    #[error("DefinitionError: {0}")]
    Definition(String),

    /// Inclusion would make a module transitively include itself
    #[error("ResolutionError: {0}")]
    Resolution(String),

    /// No implementation anywhere in the receiver's ancestor chain
    #[error("NoMethodError: undefined method '{name}' for {receiver}")]
    MethodMissing {
        /// Display form of the receiver
        receiver: String,
        /// Requested method name
        name: String,
    },

    /// An argument passed to a method had the wrong shape
    #[error("ArgumentError: {0}")]
    Argument(String),

    /// Failure raised inside a dispatched method body
    #[error(transparent)]
    Raised(Box<dyn std::error::Error + 'static>),
}

impl Error {
    /// Wrap an arbitrary failure so it can leave a method body.
    pub fn raise<E>(error: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Error::Raised(Box::new(error))
    }

    /// Recover a raised failure of a known type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Raised(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether this is a dispatch miss (as opposed to a failing method).
    pub fn is_method_missing(&self) -> bool {
        matches!(self, Error::MethodMissing { .. })
    }

    pub(crate) fn method_missing(receiver: impl std::fmt::Display, name: &str) -> Self {
        Error::MethodMissing {
            receiver: receiver.to_string(),
            name: name.to_string(),
        }
    }
}
