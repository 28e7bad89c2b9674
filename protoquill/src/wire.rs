//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev).

use crate::error::DecodeError;
use crate::leb128::LebCodec;

/// Minimum value of a protobuf field number.
pub const MINIMUM_FIELD_NUMBER: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// A decoded protobuf field key: a field number and a [`WireType`].
///
/// On the wire a key is the varint `(field_number << 3) | wire_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldKey {
    field_number: u32,
    wire_type: WireType,
}

impl FieldKey {
    /// Creates a new [`FieldKey`] from a raw key value, validating the wire
    /// type and field number.
    pub fn try_from_raw(raw_key: u64) -> Result<Self, DecodeError> {
        let wire_type = WireType::try_from_val((raw_key & 0b111) as u8)?;

        let field_number = raw_key >> 3;
        if field_number < u64::from(MINIMUM_FIELD_NUMBER)
            || field_number > u64::from(MAXIMUM_FIELD_NUMBER)
        {
            return Err(DecodeError::invalid_field_number(field_number));
        }

        Ok(FieldKey {
            // N.B. Checked above that this fits in 29 bits.
            field_number: field_number as u32,
            wire_type,
        })
    }

    #[inline]
    pub const fn field_number(self) -> u32 {
        self.field_number
    }

    #[inline]
    pub const fn wire_type(self) -> WireType {
        self.wire_type
    }

    /// Decomposes this key into its field number and [`WireType`].
    #[inline]
    pub const fn into_parts(self) -> (u32, WireType) {
        (self.field_number, self.wire_type)
    }
}

/// Encodes the provided field number and wire type as a protobuf field key.
///
/// Follows the specification from <https://protobuf.dev/programming-guides/encoding>
/// under the "Message Structure" section.
///
/// # Panics
///
/// Panics if `field_number` is outside of
/// [`MINIMUM_FIELD_NUMBER`]`..=`[`MAXIMUM_FIELD_NUMBER`], that is a bug in the
/// caller and not something the input can trigger.
#[inline]
pub fn encode_key<B: bytes::BufMut>(field_number: u32, wire_type: WireType, buf: &mut B) {
    assert!(
        (MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&field_number),
        "field number {field_number} out of range"
    );
    let key = (field_number << 3) | u32::from(wire_type.into_val());
    key.encode_leb128(buf);
}

/// Decodes the key from a protobuf encoded message.
#[inline]
pub fn decode_key<B: bytes::Buf>(buf: &mut B) -> Result<FieldKey, DecodeError> {
    let (raw_key, _) = u64::decode_leb128_buf(buf)?;
    FieldKey::try_from_raw(raw_key)
}

/// Decodes the length prefix for a length-delimited field.
///
/// The length is validated against the bytes remaining in `buf`.
#[inline]
pub fn decode_len<B: bytes::Buf>(buf: &mut B) -> Result<usize, DecodeError> {
    let (len, _) = u64::decode_leb128_buf(buf)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::length_overflow(len))?;
    if buf.remaining() < len {
        return Err(DecodeError::unexpected_end_of_buffer());
    }
    Ok(len)
}

/// Skips over a field value based on its wire type.
///
/// Protobuf supports backwards and forwards compatibility by skipping fields
/// we don't know about. We "skip" a field by advancing our buffer past it.
pub fn skip_field<B: bytes::Buf>(wire_type: WireType, buf: &mut B) -> Result<(), DecodeError> {
    let skip_len = match wire_type {
        WireType::Varint => {
            u64::decode_leb128_buf(buf)?;
            return Ok(());
        }
        WireType::I64 => 8,
        WireType::Len => decode_len(buf)?,
        WireType::I32 => 4,
        WireType::SGroup | WireType::EGroup => {
            return Err(DecodeError::deprecated_group_encoding());
        }
    };

    if buf.remaining() < skip_len {
        return Err(DecodeError::unexpected_end_of_buffer());
    }
    buf.advance(skip_len);
    Ok(())
}

/// Maps a signed 32-bit integer onto an unsigned one so that values of small
/// magnitude, positive or negative, encode as short varints.
#[inline]
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// 64-bit version of [`zigzag_encode_32`].
#[inline]
pub const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. When encoded each key-value pair
/// is turned into a record consisting of a field number, a [`WireType`], and a payload.
/// The [`WireType`] indicates how large the proceeding payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit integer.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (deprecated).
    SGroup = 3,
    /// Group end (deprecated).
    EGroup = 4,
    /// 32-bit integer.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

impl WireType {
    /// Try to decode a [`WireType`] from the provided raw value.
    pub fn try_from_val(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            other => Err(DecodeError::invalid_wire_type(other)),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline]
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, DecodeError> {
        WireType::try_from_val(value)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    #[test]
    fn proptest_key_roundtrips() {
        fn arb_field_number() -> impl Strategy<Value = u32> {
            MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER
        }

        fn arb_wiretype() -> impl Strategy<Value = WireType> {
            prop_oneof![
                Just(WireType::Varint),
                Just(WireType::I64),
                Just(WireType::Len),
                Just(WireType::I32),
            ]
        }

        fn test(field_number: u32, wire_type: WireType) {
            let mut buf = Vec::with_capacity(16);
            encode_key(field_number, wire_type, &mut buf);
            let key = decode_key(&mut &buf[..]).unwrap();

            assert_eq!(key.into_parts(), (field_number, wire_type));
        }

        let strat = (arb_field_number(), arb_wiretype());
        proptest!(|((field_number, wire_type) in strat)| test(field_number, wire_type))
    }

    #[property_test]
    fn proptest_zigzag_32(n: i32) {
        prop_assert_eq!(zigzag_decode_32(zigzag_encode_32(n)), n);
    }

    #[property_test]
    fn proptest_zigzag_64(n: i64) {
        prop_assert_eq!(zigzag_decode_64(zigzag_encode_64(n)), n);
    }

    #[test]
    fn test_zigzag_values() {
        assert_eq!(zigzag_encode_32(0), 0);
        assert_eq!(zigzag_encode_32(-1), 1);
        assert_eq!(zigzag_encode_32(1), 2);
        assert_eq!(zigzag_encode_32(-2), 3);
        assert_eq!(zigzag_encode_32(i32::MAX), u32::MAX - 1);
        assert_eq!(zigzag_encode_32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_encode_64(i64::MIN), u64::MAX);
    }

    #[test]
    fn test_all_valid_values() {
        for i in u8::MIN..u8::MAX {
            let wire_type = WireType::try_from_val(i);
            match (i, wire_type) {
                (0, Ok(WireType::Varint))
                | (1, Ok(WireType::I64))
                | (2, Ok(WireType::Len))
                | (3, Ok(WireType::SGroup))
                | (4, Ok(WireType::EGroup))
                | (5, Ok(WireType::I32)) => (),
                (6.., Err(_)) => (),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_key_rejects_field_zero() {
        // Field 0, wire type varint.
        let mut buf = &[0x00u8][..];
        assert_eq!(
            decode_key(&mut buf),
            Err(DecodeError::InvalidFieldNumber { value: 0 })
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_encode_key_rejects_out_of_range() {
        let mut buf = Vec::new();
        encode_key(MAXIMUM_FIELD_NUMBER + 1, WireType::Varint, &mut buf);
    }

    #[test]
    fn test_decode_len() {
        let mut buf = &[0u8][..];
        assert_eq!(decode_len(&mut buf).unwrap(), 0);

        let mut buf = &[3u8, 1, 2, 3][..];
        assert_eq!(decode_len(&mut buf).unwrap(), 3);

        // Length 300, but the payload is missing.
        let mut buf = &[0xAC, 0x02][..];
        assert_eq!(
            decode_len(&mut buf),
            Err(DecodeError::UnexpectedEndOfBuffer)
        );
    }

    #[test]
    fn test_skip_field() {
        let mut buf = &[0x80, 0x01, 99][..];
        skip_field(WireType::Varint, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[1, 2, 3, 4, 99][..];
        skip_field(WireType::I32, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[1, 2, 3, 4, 5, 6, 7, 8, 99][..];
        skip_field(WireType::I64, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[3, 1, 2, 3, 99][..];
        skip_field(WireType::Len, &mut buf).unwrap();
        assert_eq!(buf, &[99]);

        let mut buf = &[1, 2, 3][..];
        assert!(skip_field(WireType::I32, &mut buf).is_err());
    }

    #[test]
    fn test_skip_field_groups_error() {
        let mut buf = &[0u8][..];
        assert!(skip_field(WireType::SGroup, &mut buf).is_err());
        assert!(skip_field(WireType::EGroup, &mut buf).is_err());
    }
}
