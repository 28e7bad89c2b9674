//! Cursor based decoder for the protobuf binary format.

use crate::error::DecodeError;
use crate::leb128::LebCodec;
use crate::message::BinaryCodec;
use crate::wire::{
    decode_key, decode_len, skip_field, zigzag_decode_32, zigzag_decode_64, FieldKey, WireType,
};

/// Maximum depth of nested messages a [`Reader`] will descend into.
pub const RECURSION_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotStarted,
    /// Positioned on a field. `consumed` tracks whether its payload was read.
    Positioned { key: FieldKey, consumed: bool },
    Exhausted,
}

/// A cursor over an encoded message.
///
/// ```text
/// not-started -> next_field() == true  -> positioned -> read_*() / skip_field()
///             -> next_field() == true  -> positioned -> ...
///             -> next_field() == false -> exhausted
/// ```
///
/// [`Reader::next_field`] skips the payload of a field that was not read, so
/// callers only need to handle the field numbers they know about. Once
/// exhausted a `Reader` stays exhausted.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    state: State,
    depth: usize,
}

macro_rules! scalar_readers {
    ($( $read:ident, $read_repeated:ident, $get:ident, $ty:ty, $wire:expr; )*) => {
        $(
            #[inline]
            pub fn $read(&mut self) -> Result<$ty, DecodeError> {
                self.begin($wire)?;
                $get(&mut self.buf)
            }

            /// Appends the current field to `dst`, accepting both the packed
            /// and the unpacked encoding.
            pub fn $read_repeated(&mut self, dst: &mut Vec<$ty>) -> Result<(), DecodeError> {
                if self.wire_type() == WireType::Len {
                    let mut packed = self.take_delimited()?;
                    while !packed.is_empty() {
                        dst.push($get(&mut packed)?);
                    }
                } else {
                    dst.push(self.$read()?);
                }
                Ok(())
            }
        )*
    };
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader {
            buf,
            state: State::NotStarted,
            depth: 0,
        }
    }

    fn with_depth(buf: &'a [u8], depth: usize) -> Result<Self, DecodeError> {
        if depth > RECURSION_LIMIT {
            return Err(DecodeError::RecursionLimitExceeded {
                limit: RECURSION_LIMIT,
            });
        }
        Ok(Reader {
            buf,
            state: State::NotStarted,
            depth,
        })
    }

    /// Advances to the next field, returning `false` once the buffer is
    /// exhausted.
    pub fn next_field(&mut self) -> Result<bool, DecodeError> {
        match self.state {
            State::Exhausted => return Ok(false),
            State::Positioned {
                key,
                consumed: false,
            } => skip_field(key.wire_type(), &mut self.buf)?,
            State::Positioned { .. } | State::NotStarted => (),
        }

        if self.buf.is_empty() {
            self.state = State::Exhausted;
            return Ok(false);
        }

        let key = decode_key(&mut self.buf)?;
        if matches!(key.wire_type(), WireType::SGroup | WireType::EGroup) {
            return Err(DecodeError::deprecated_group_encoding());
        }
        self.state = State::Positioned {
            key,
            consumed: false,
        };
        Ok(true)
    }

    fn key(&self) -> FieldKey {
        match self.state {
            State::Positioned { key, .. } => key,
            State::NotStarted | State::Exhausted => {
                panic!("Reader is not positioned on a field, call next_field() first")
            }
        }
    }

    /// Field number of the current field.
    ///
    /// # Panics
    ///
    /// Panics unless the last call to [`Reader::next_field`] returned `true`.
    pub fn field_number(&self) -> u32 {
        self.key().field_number()
    }

    /// Wire type of the current field.
    ///
    /// # Panics
    ///
    /// Panics unless the last call to [`Reader::next_field`] returned `true`.
    pub fn wire_type(&self) -> WireType {
        self.key().wire_type()
    }

    /// Marks the payload of the current field as consumed, checking it was
    /// encoded with `expected`.
    fn begin(&mut self, expected: WireType) -> Result<(), DecodeError> {
        let key = self.key();
        if let State::Positioned { consumed: true, .. } = self.state {
            panic!("payload of field {} was already read", key.field_number());
        }
        if key.wire_type() != expected {
            return Err(DecodeError::WireTypeMismatch {
                field_number: key.field_number(),
                expected,
                actual: key.wire_type(),
            });
        }
        self.state = State::Positioned {
            key,
            consumed: true,
        };
        Ok(())
    }

    /// Returns the payload of the current length-delimited field.
    fn take_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        self.begin(WireType::Len)?;
        let len = decode_len(&mut self.buf)?;
        let buf: &'a [u8] = self.buf;
        let (payload, rest) = buf.split_at(len);
        self.buf = rest;
        Ok(payload)
    }

    scalar_readers! {
        read_int32, read_repeated_int32, get_int32, i32, WireType::Varint;
        read_int64, read_repeated_int64, get_int64, i64, WireType::Varint;
        read_uint32, read_repeated_uint32, get_uint32, u32, WireType::Varint;
        read_uint64, read_repeated_uint64, get_varint, u64, WireType::Varint;
        read_sint32, read_repeated_sint32, get_sint32, i32, WireType::Varint;
        read_sint64, read_repeated_sint64, get_sint64, i64, WireType::Varint;
        read_bool, read_repeated_bool, get_bool, bool, WireType::Varint;
        read_fixed32, read_repeated_fixed32, get_fixed32, u32, WireType::I32;
        read_fixed64, read_repeated_fixed64, get_fixed64, u64, WireType::I64;
        read_sfixed32, read_repeated_sfixed32, get_sfixed32, i32, WireType::I32;
        read_sfixed64, read_repeated_sfixed64, get_sfixed64, i64, WireType::I64;
        read_float, read_repeated_float, get_float, f32, WireType::I32;
        read_double, read_repeated_double, get_double, f64, WireType::I64;
    }

    /// Reads a `bytes` field without copying.
    pub fn read_bytes_ref(&mut self) -> Result<&'a [u8], DecodeError> {
        self.take_delimited()
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.take_delimited().map(<[u8]>::to_vec)
    }

    pub fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let payload = self.take_delimited()?;
        std::str::from_utf8(payload).map_err(|_| DecodeError::invalid_utf8())
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        self.read_str().map(str::to_owned)
    }

    /// Merges the current length-delimited field into `message`.
    pub fn read_message<M: BinaryCodec>(&mut self, message: &mut M) -> Result<(), DecodeError> {
        self.read_nested(|nested| message.merge_fields(nested))
    }

    /// Runs `f` over a [`Reader`] scoped to the payload of the current
    /// length-delimited field.
    pub fn read_nested<T, F>(&mut self, f: F) -> Result<T, DecodeError>
    where
        F: FnOnce(&mut Reader<'a>) -> Result<T, DecodeError>,
    {
        let payload = self.take_delimited()?;
        let mut nested = Reader::with_depth(payload, self.depth + 1)?;
        f(&mut nested)
    }

    /// Consumes and discards the payload of the current field.
    pub fn skip_field(&mut self) -> Result<(), DecodeError> {
        let key = self.key();
        self.begin(key.wire_type())?;
        skip_field(key.wire_type(), &mut self.buf)
    }
}

fn get_varint(buf: &mut &[u8]) -> Result<u64, DecodeError> {
    u64::decode_leb128_buf(buf).map(|(value, _)| value)
}

// Truncation matches protobuf encoding rules: an int32 is written sign-extended, so
// the low 32 bits hold the value.
#[allow(clippy::cast_possible_truncation)]
fn get_int32(buf: &mut &[u8]) -> Result<i32, DecodeError> {
    get_varint(buf).map(|value| value as i32)
}

fn get_int64(buf: &mut &[u8]) -> Result<i64, DecodeError> {
    get_varint(buf).map(|value| value as i64)
}

#[allow(clippy::cast_possible_truncation)]
fn get_uint32(buf: &mut &[u8]) -> Result<u32, DecodeError> {
    get_varint(buf).map(|value| value as u32)
}

fn get_sint32(buf: &mut &[u8]) -> Result<i32, DecodeError> {
    get_uint32(buf).map(zigzag_decode_32)
}

fn get_sint64(buf: &mut &[u8]) -> Result<i64, DecodeError> {
    get_varint(buf).map(zigzag_decode_64)
}

fn get_bool(buf: &mut &[u8]) -> Result<bool, DecodeError> {
    get_varint(buf).map(|value| value != 0)
}

fn take_array<const N: usize>(buf: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    let (head, rest) = buf
        .split_first_chunk::<N>()
        .ok_or_else(DecodeError::unexpected_end_of_buffer)?;
    *buf = rest;
    Ok(*head)
}

fn get_fixed32(buf: &mut &[u8]) -> Result<u32, DecodeError> {
    take_array(buf).map(u32::from_le_bytes)
}

fn get_fixed64(buf: &mut &[u8]) -> Result<u64, DecodeError> {
    take_array(buf).map(u64::from_le_bytes)
}

fn get_sfixed32(buf: &mut &[u8]) -> Result<i32, DecodeError> {
    take_array(buf).map(i32::from_le_bytes)
}

fn get_sfixed64(buf: &mut &[u8]) -> Result<i64, DecodeError> {
    take_array(buf).map(i64::from_le_bytes)
}

fn get_float(buf: &mut &[u8]) -> Result<f32, DecodeError> {
    get_fixed32(buf).map(f32::from_bits)
}

fn get_double(buf: &mut &[u8]) -> Result<f64, DecodeError> {
    get_fixed64(buf).map(f64::from_bits)
}
