//! Errors surfaced while decoding or encoding messages.
//!
//! Malformed input is always a recoverable [`DecodeError`]. A value that
//! decoded fine but cannot be written in a requested form is an
//! [`EncodeError`]. Misuse of the [`Writer`](crate::Writer) or
//! [`Reader`](crate::Reader) APIs, like an out of range field number, is a
//! programming error and panics instead.

use crate::wire::WireType;

/// Error returned when binary or JSON input cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid 'wire type' value: {value}")]
    InvalidWireType { value: u8 },
    #[error("invalid field number: {value}")]
    InvalidFieldNumber { value: u64 },
    #[error("invalid leb128 varint")]
    InvalidVarint,
    #[error("unexpected end of buffer")]
    UnexpectedEndOfBuffer,
    #[error("deprecated group encoding not supported")]
    DeprecatedGroupEncoding,
    #[error("field {field_number}: expected wire type {expected:?}, found {actual:?}")]
    WireTypeMismatch {
        field_number: u32,
        expected: WireType,
        actual: WireType,
    },
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("length prefix {value} exceeds platform addressable memory")]
    LengthOverflow { value: u64 },
    #[error("message nesting exceeds the limit of {limit}")]
    RecursionLimitExceeded { limit: usize },
    #[error("invalid JSON: {reason}")]
    InvalidJson { reason: String },
    #[error("expected a JSON {expected}")]
    UnexpectedJsonType { expected: &'static str },
    #[error("invalid number: '{value}'")]
    InvalidNumber { value: String },
    #[error("invalid base64 string")]
    InvalidBase64,
    #[error("unknown value '{value}' for enum {enum_name}")]
    InvalidEnumValue {
        enum_name: &'static str,
        value: String,
    },
    #[error("invalid timestamp: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("invalid duration: '{value}'")]
    InvalidDuration { value: String },
    #[error("field '{field}' given under both of its names")]
    DuplicateField { field: &'static str },
    #[error("more than one member of oneof '{oneof}' is set")]
    ConflictingOneof { oneof: &'static str },
}

impl DecodeError {
    #[cold]
    pub fn invalid_wire_type(value: u8) -> Self {
        DecodeError::InvalidWireType { value }
    }

    #[cold]
    pub fn invalid_field_number(value: u64) -> Self {
        DecodeError::InvalidFieldNumber { value }
    }

    #[cold]
    pub fn invalid_varint() -> Self {
        DecodeError::InvalidVarint
    }

    #[cold]
    pub fn unexpected_end_of_buffer() -> Self {
        DecodeError::UnexpectedEndOfBuffer
    }

    #[cold]
    pub fn deprecated_group_encoding() -> Self {
        DecodeError::DeprecatedGroupEncoding
    }

    #[cold]
    pub fn invalid_utf8() -> Self {
        DecodeError::InvalidUtf8
    }

    #[cold]
    pub fn length_overflow(value: u64) -> Self {
        DecodeError::LengthOverflow { value }
    }

    #[cold]
    pub fn unexpected_json_type(expected: &'static str) -> Self {
        DecodeError::UnexpectedJsonType { expected }
    }

    #[cold]
    pub fn invalid_number(value: impl ToString) -> Self {
        DecodeError::InvalidNumber {
            value: value.to_string(),
        }
    }

    #[cold]
    pub fn duplicate_field(field: &'static str) -> Self {
        DecodeError::DuplicateField { field }
    }

    #[cold]
    pub fn conflicting_oneof(oneof: &'static str) -> Self {
        DecodeError::ConflictingOneof { oneof }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidJson {
            reason: err.to_string(),
        }
    }
}

/// Error returned when a decoded message cannot be written out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    TimestampOutOfRange { seconds: i64, nanos: i32 },
    #[error("duration out of range: {seconds}s {nanos}ns")]
    DurationOutOfRange { seconds: i64, nanos: i32 },
    #[error("failed to produce JSON: {reason}")]
    Json { reason: String },
}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        EncodeError::Json {
            reason: err.to_string(),
        }
    }
}
