use std::fmt;

use crate::error::{DecodeError, EncodeError};
use crate::json::Value;
use crate::reader::Reader;
use crate::writer::Writer;

/// A generated protobuf message.
///
/// Messages are plain data. Construction from a partially specified value
/// goes through [`Message::initialize`], the wire formats through
/// [`BinaryCodec`] and [`JsonCodec`].
pub trait Message: Default + Clone + PartialEq + fmt::Debug {
    /// Fully-qualified protobuf name, e.g. `shop.Hat`.
    const NAME: &'static str;

    /// The deeply optional shape of this message.
    ///
    /// Every field is an `Option`, nested message fields hold the nested
    /// message's own `Partial`.
    type Partial: Default;

    /// Builds a message with every field at its default, then overlays the
    /// fields set in `partial`.
    fn initialize(partial: Self::Partial) -> Self;
}

/// Protobuf binary format support for a [`Message`].
pub trait BinaryCodec: Message {
    /// Writes every present field, in ascending field number order.
    fn encode_fields(&self, writer: &mut Writer);

    /// Merges fields from `reader` into `self` until it is exhausted.
    ///
    /// Singular fields are overwritten, repeated fields appended to and
    /// sub-messages merged. Unknown fields are skipped.
    fn merge_fields(&mut self, reader: &mut Reader<'_>) -> Result<(), DecodeError>;

    fn encode_binary(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.encode_fields(&mut writer);
        writer.finish()
    }

    fn decode_binary(data: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge_binary(data)?;
        Ok(message)
    }

    fn merge_binary(&mut self, data: &[u8]) -> Result<(), DecodeError> {
        let mut reader = Reader::new(data);
        self.merge_fields(&mut reader)
    }
}

/// Canonical protobuf JSON support for a [`Message`].
pub trait JsonCodec: Message {
    /// Builds the JSON form of this message, omitting default valued fields.
    fn to_json(&self) -> Result<Value, EncodeError>;

    /// Merges a JSON value into `self`.
    ///
    /// Keys may use either the JSON name or the original field name. Unknown
    /// keys are ignored and `null` is treated like an absent key.
    fn merge_json(&mut self, value: &Value) -> Result<(), DecodeError>;

    fn encode_json(&self) -> Result<String, EncodeError> {
        let value = self.to_json()?;
        Ok(serde_json::to_string(&value)?)
    }

    fn decode_json(text: &str) -> Result<Self, DecodeError> {
        let value = crate::json::parse(text)?;
        let mut message = Self::default();
        message.merge_json(&value)?;
        Ok(message)
    }
}

/// A generated protobuf enum.
///
/// Message fields store enums as their raw `i32` so unknown values survive a
/// round trip, this trait maps between the raw value, the Rust enum and the
/// declared value names.
pub trait ProtoEnum: Copy + Sized + 'static {
    /// Fully-qualified protobuf name of the enum.
    const NAME: &'static str;

    fn from_i32(value: i32) -> Option<Self>;

    fn from_str_name(name: &str) -> Option<Self>;

    fn as_str_name(&self) -> &'static str;

    fn to_i32(self) -> i32;
}
