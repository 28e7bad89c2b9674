//! Error types for protoquill-build.

use std::io;

use protoquill::DecodeError;

/// Errors that can occur during protobuf code generation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("protoc not found. Set PROTOC env var or install protoc.")]
    ProtocNotFound,
    #[error("protoc failed: {}", truncated(.0))]
    ProtocFailed(String),
    #[error("failed to decode descriptor: {0}")]
    Decode(#[from] DecodeError),
    #[error("OUT_DIR not set. Run from build.rs or set out_dir().")]
    MissingOutDir,
    #[error("file_descriptor_set_path required when skip_protoc is set")]
    MissingDescriptorPath,
    #[error("missing name in descriptor")]
    MissingName,
    #[error("missing number for field '{0}'")]
    MissingFieldNumber(String),
    #[error("invalid type {value} for field '{field}'")]
    InvalidFieldType { field: String, value: i32 },
    #[error("field '{0}' is a group, groups are not supported")]
    GroupsUnsupported(String),
    #[error("{file}: {reason} is not supported, only proto3 files can be generated")]
    Proto2Unsupported { file: String, reason: &'static str },
    #[error("field '{field}' references unknown type '{type_name}'")]
    UnresolvedType { field: String, type_name: String },
    #[error("message '{message}' uses field number {number} more than once")]
    DuplicateFieldNumber { message: String, number: i32 },
    #[error("invalid map entry '{0}'")]
    InvalidMapEntry(String),
    #[error("invalid extern path '{rust_path}' for '{proto_path}'")]
    InvalidExternPath {
        proto_path: String,
        rust_path: String,
    },
    #[error("failed to parse generated code: {0}")]
    SynParse(String),
    #[error("unsupported target '{0}', the only supported target is 'rust'")]
    UnsupportedTarget(String),
    #[error("'{0}' is a well-known type, enable emit_well_known_types to generate it")]
    UnsupportedWellKnownType(String),
    #[error("invalid plugin parameter '{0}'")]
    InvalidParameter(String),
}

/// Very long protoc output is cut to keep errors readable.
fn truncated(msg: &str) -> String {
    const MAX_LEN: usize = 1000;
    if msg.len() <= MAX_LEN {
        return msg.to_owned();
    }
    let mut end = MAX_LEN;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &msg[..end])
}
