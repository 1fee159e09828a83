//! Error taxonomy for the metadata engine.
//!
//! Absence of a value is never an error: resolvers return `Option::None` when
//! no namespace yields anything. Errors are reserved for malformed input and
//! configuration defects:
//!
//! | Variant | Meaning | Typical handling |
//! |---|---|---|
//! | [`NotFound`](MetadataError::NotFound) | a named entry or key does not exist | informational, not logged as an error |
//! | [`InvalidEncoding`](MetadataError::InvalidEncoding) | a raw value exists but cannot be decoded | reported, field treated as absent |
//! | [`InvalidArgument`](MetadataError::InvalidArgument) | caller passed an out-of-range or malformed value | returned to caller |
//! | [`Configuration`](MetadataError::Configuration) | catalog or category defect | fatal for the operation |

use crate::store::Container;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("cannot decode {container} tag {key}: {reason}")]
    InvalidEncoding {
        container: Container,
        key: String,
        reason: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MetadataError {
    pub(crate) fn encoding(container: Container, key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            container,
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
