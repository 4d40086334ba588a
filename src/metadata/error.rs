//! Error types for metadata decoding.

use thiserror::Error;

/// Errors raised while decoding serialized descriptor metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// Input ended in the middle of a value.
    #[error("Truncated metadata: {0}")]
    Truncated(&'static str),

    /// Wire type outside 0..=5 or a deprecated group type.
    #[error("Unsupported wire type {wire_type} for field {field}")]
    InvalidWireType { field: u32, wire_type: u8 },

    /// Varint longer than ten bytes.
    #[error("Varint overflow")]
    VarintOverflow,

    /// A required field was absent.
    #[error("Missing required field '{field}' in {message}")]
    MissingField {
        message: &'static str,
        field: &'static str,
    },

    /// A string or qualified-name index points outside its table.
    #[error("Invalid {table} index {index}")]
    InvalidIndex { table: &'static str, index: i32 },

    /// Text or encoding-level problem (bit encoding, UTF-8).
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

impl MetadataError {
    pub fn missing(message: &'static str, field: &'static str) -> Self {
        Self::MissingField { message, field }
    }

    pub fn invalid_index(table: &'static str, index: i32) -> Self {
        Self::InvalidIndex { table, index }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::InvalidEncoding(message.into())
    }
}
