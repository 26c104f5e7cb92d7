//! Error types produced while constructing and feeding a [`Konfig`] store.
//!
//! Per-query outcomes never use these types: lookups report absence and
//! decode failures through the sentinel revisions in [`crate::revision`].
//!
//! [`Konfig`]: crate::Konfig

use std::num::ParseIntError;

use thiserror::Error;

/// Boxed error returned by external collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while initialising or driving a store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KonfigError {
    /// The initial fetch failed for a reason other than the resource being
    /// absent.
    #[error("failed to fetch ConfigMap '{name}': {source}")]
    Fetch {
        /// Name of the ConfigMap being fetched.
        name: String,
        /// Underlying error reported by the source.
        #[source]
        source: BoxError,
    },

    /// The change stream could not be opened.
    #[error("failed to watch ConfigMap '{name}': {source}")]
    Watch {
        /// Name of the ConfigMap being watched.
        name: String,
        /// Underlying error reported by the source.
        #[source]
        source: BoxError,
    },

    /// A resource version token was not a decimal integer.
    #[error("invalid resource version '{token}': {source}")]
    InvalidRevision {
        /// Token as delivered by the source.
        token: String,
        /// Integer parse failure.
        #[source]
        source: ParseIntError,
    },

    /// Store options could not be extracted.
    #[error("failed to load konfig options: {0}")]
    Options(#[from] Box<figment::Error>),

    /// An informer callback fired after the update pump stopped.
    #[error("update pump for ConfigMap '{name}' is no longer running")]
    ChannelClosed {
        /// Name of the ConfigMap the handle was bound to.
        name: String,
    },
}

impl From<figment::Error> for KonfigError {
    fn from(err: figment::Error) -> Self {
        Self::Options(Box::new(err))
    }
}

/// Result alias used throughout the crate.
pub type KonfigResult<T> = Result<T, KonfigError>;
