//! Weakly typed decoding of value subtrees into serde types.
//!
//! The destination's `Deserialize` impl acts as its field table: serde
//! hands the decoder the declared field names, and the decoder matches
//! subtree keys against them using a [`FieldTag`] naming convention.
//! Scalars are converted with the rules in [`crate::value::coerce`].

mod de;
mod tag;

use std::fmt;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::value::Value;

pub use de::ValueDeserializer;
pub use tag::{FieldTag, UnknownFieldTag};

/// Failure to decode a subtree into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    /// Human-readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn invalid(value: &Value, expected: &str) -> Self {
        Self {
            message: format!("cannot decode {} `{value}` as {expected}", value.kind()),
        }
    }

    /// Prefix the message with the key that was being decoded.
    pub(crate) fn at(self, key: &str) -> Self {
        Self {
            message: format!("{key}: {}", self.message),
        }
    }
}

impl serde::de::Error for DecodeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            message: msg.to_string(),
        }
    }
}

/// Decode `value` into a fresh `T`.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the subtree cannot be mapped onto `T`,
/// for example when a field holds an inconvertible scalar or a required
/// field is missing.
pub fn decode_value<T: DeserializeOwned>(value: &Value, tag: FieldTag) -> Result<T, DecodeError> {
    T::deserialize(ValueDeserializer::new(value, tag))
}
