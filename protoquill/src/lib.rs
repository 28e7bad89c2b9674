//! Runtime support for code generated by `protoquill-build`.
//!
//! Generated messages are plain structs. All of their behavior lives in trait
//! impls built on the primitives in this crate:
//!
//! * [`Writer`] and [`Reader`] implement the protobuf binary wire format.
//! * [`json`] implements the canonical protobuf JSON mapping.
//! * [`wkt`] carries the well-known types with special JSON forms.
//!
//! ```
//! use protoquill::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.write_int32(1, 3);
//! writer.write_string(2, "red");
//! let bytes = writer.finish();
//!
//! let mut reader = Reader::new(&bytes);
//! assert!(reader.next_field().unwrap());
//! assert_eq!(reader.field_number(), 1);
//! assert_eq!(reader.read_int32().unwrap(), 3);
//! ```

pub mod error;
pub mod json;
pub mod leb128;
mod message;
pub mod reader;
pub mod wire;
pub mod wkt;
pub mod writer;

pub use error::{DecodeError, EncodeError};
pub use message::{BinaryCodec, JsonCodec, Message, ProtoEnum};
pub use reader::Reader;
pub use writer::Writer;
