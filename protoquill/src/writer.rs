//! Append-only encoder for the protobuf binary format.

use bytes::{BufMut, Bytes, BytesMut};

use crate::leb128::LebCodec;
use crate::message::BinaryCodec;
use crate::wire::{encode_key, zigzag_encode_32, zigzag_encode_64, WireType};

/// An append-only byte sink with one write operation per protobuf scalar
/// type.
///
/// Every `write_*` method emits a complete record: the field key followed by
/// the payload. The `put_*` methods emit only the payload and are used for
/// packed repeated fields.
///
/// A `Writer` is owned by a single encode call. Length-delimited records are
/// built by buffering the nested payload in a child `Writer`, the outer key
/// and length can only be written once the payload size is known.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
}

macro_rules! scalar_writers {
    ($( $(#[$doc:meta])* $write:ident, $put:ident, $packed:ident, $ty:ty, $wire:expr; )*) => {
        $(
            $(#[$doc])*
            #[inline]
            pub fn $write(&mut self, field_number: u32, value: $ty) {
                self.write_tag(field_number, $wire);
                self.$put(value);
            }

            /// Writes all of `values` as a single packed record.
            pub fn $packed(&mut self, field_number: u32, values: &[$ty]) {
                self.write_nested(field_number, |packed| {
                    for value in values {
                        packed.$put(*value);
                    }
                });
            }
        )*
    };
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer, returning the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf.to_vec()
    }

    /// Consumes the writer, returning the encoded bytes without copying.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Writes a field key.
    ///
    /// # Panics
    ///
    /// Panics if `field_number` is not a valid protobuf field number.
    #[inline]
    pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) {
        encode_key(field_number, wire_type, &mut self.buf);
    }

    #[inline]
    pub fn put_varint(&mut self, value: u64) {
        value.encode_leb128(&mut self.buf);
    }

    /// Negative values are sign-extended to 64 bits, so they always take
    /// 10 bytes on the wire.
    #[inline]
    pub fn put_int32(&mut self, value: i32) {
        self.put_varint(i64::from(value) as u64);
    }

    #[inline]
    pub fn put_int64(&mut self, value: i64) {
        self.put_varint(value as u64);
    }

    #[inline]
    pub fn put_uint32(&mut self, value: u32) {
        self.put_varint(u64::from(value));
    }

    #[inline]
    pub fn put_uint64(&mut self, value: u64) {
        self.put_varint(value);
    }

    #[inline]
    pub fn put_sint32(&mut self, value: i32) {
        self.put_varint(u64::from(zigzag_encode_32(value)));
    }

    #[inline]
    pub fn put_sint64(&mut self, value: i64) {
        self.put_varint(zigzag_encode_64(value));
    }

    #[inline]
    pub fn put_bool(&mut self, value: bool) {
        self.put_varint(u64::from(value));
    }

    #[inline]
    pub fn put_fixed32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    #[inline]
    pub fn put_fixed64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    #[inline]
    pub fn put_sfixed32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    #[inline]
    pub fn put_sfixed64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    /// Floats are written from their exact IEEE-754 bit pattern.
    #[inline]
    pub fn put_float(&mut self, value: f32) {
        self.put_fixed32(value.to_bits());
    }

    #[inline]
    pub fn put_double(&mut self, value: f64) {
        self.put_fixed64(value.to_bits());
    }

    /// Writes a length prefix followed by `value`.
    #[inline]
    pub fn put_bytes(&mut self, value: &[u8]) {
        self.put_varint(value.len() as u64);
        self.buf.put_slice(value);
    }

    scalar_writers! {
        write_int32, put_int32, write_packed_int32, i32, WireType::Varint;
        write_int64, put_int64, write_packed_int64, i64, WireType::Varint;
        write_uint32, put_uint32, write_packed_uint32, u32, WireType::Varint;
        write_uint64, put_uint64, write_packed_uint64, u64, WireType::Varint;
        write_sint32, put_sint32, write_packed_sint32, i32, WireType::Varint;
        write_sint64, put_sint64, write_packed_sint64, i64, WireType::Varint;
        write_bool, put_bool, write_packed_bool, bool, WireType::Varint;
        write_fixed32, put_fixed32, write_packed_fixed32, u32, WireType::I32;
        write_fixed64, put_fixed64, write_packed_fixed64, u64, WireType::I64;
        write_sfixed32, put_sfixed32, write_packed_sfixed32, i32, WireType::I32;
        write_sfixed64, put_sfixed64, write_packed_sfixed64, i64, WireType::I64;
        write_float, put_float, write_packed_float, f32, WireType::I32;
        write_double, put_double, write_packed_double, f64, WireType::I64;
    }

    /// Writes a `bytes` field.
    pub fn write_bytes(&mut self, field_number: u32, value: &[u8]) {
        self.write_tag(field_number, WireType::Len);
        self.put_bytes(value);
    }

    /// Writes a `string` field. The length prefix is the UTF-8 byte length.
    pub fn write_string(&mut self, field_number: u32, value: &str) {
        self.write_bytes(field_number, value.as_bytes());
    }

    /// Writes a length-delimited record whose payload is produced by `f`.
    ///
    /// The payload is buffered in a child writer so its length is known
    /// before the outer key and length prefix are emitted.
    pub fn write_nested(&mut self, field_number: u32, f: impl FnOnce(&mut Writer)) {
        let mut child = Writer::new();
        f(&mut child);

        self.write_tag(field_number, WireType::Len);
        self.put_bytes(&child.buf);
    }

    /// Writes `message` as a length-delimited sub-message.
    pub fn write_message<M: BinaryCodec>(&mut self, field_number: u32, message: &M) {
        self.write_nested(field_number, |nested| message.encode_fields(nested));
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::Writer;
    use crate::leb128::LebCodec;
    use crate::reader::Reader;

    fn encode(f: impl FnOnce(&mut Writer)) -> Vec<u8> {
        let mut writer = Writer::new();
        f(&mut writer);
        writer.finish()
    }

    #[test]
    fn test_varint_boundaries() {
        #[track_caller]
        fn test_case(value: u64, len: usize) {
            let bytes = encode(|w| w.put_varint(value));
            assert_eq!(bytes.len(), len, "length of {value}");

            let (decoded, _) = u64::decode_leb128_buf(&mut &bytes[..]).unwrap();
            assert_eq!(decoded, value);
        }

        test_case(0, 1);
        test_case(127, 1);
        test_case(128, 2);
        test_case((1 << 31) - 1, 5);
        test_case((1 << 32) - 1, 5);
        test_case((1 << 63) - 1, 9);
        test_case(u64::MAX, 10);
    }

    #[test]
    fn test_negative_int32_takes_ten_bytes() {
        let bytes = encode(|w| w.put_int32(-1));
        assert_eq!(
            bytes,
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );

        let bytes = encode(|w| w.put_int32(i32::MIN));
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[9], 0x01);

        let bytes = encode(|w| w.put_int64(-1));
        assert_eq!(bytes.len(), 10);
    }

    #[test]
    fn test_sint32_is_short_for_small_negatives() {
        assert_eq!(encode(|w| w.put_sint32(-1)), [0x01]);
        assert_eq!(encode(|w| w.put_sint32(1)), [0x02]);
        assert_eq!(encode(|w| w.put_sint64(-64)), [0x7f]);
    }

    #[test]
    fn test_fixed_width_is_little_endian() {
        assert_eq!(encode(|w| w.put_fixed32(1)), [1, 0, 0, 0]);
        assert_eq!(encode(|w| w.put_sfixed64(-2)), [0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(encode(|w| w.put_float(1.0)), 1.0f32.to_bits().to_le_bytes());
    }

    #[test]
    fn test_string_length_is_utf8_byte_length() {
        // 'é' is two bytes in UTF-8.
        let bytes = encode(|w| w.write_string(2, "é"));
        assert_eq!(bytes, [0x12, 0x02, 0xc3, 0xa9]);
    }

    #[test]
    fn test_hat_encoding() {
        let bytes = encode(|w| {
            w.write_int32(1, 3);
            w.write_string(2, "red");
        });
        assert_eq!(bytes, [0x08, 0x03, 0x12, 0x03, b'r', b'e', b'd']);
    }

    #[test]
    fn test_packed() {
        let bytes = encode(|w| w.write_packed_int32(4, &[1, 2, 300]));
        assert_eq!(bytes, [0x22, 0x04, 0x01, 0x02, 0xac, 0x02]);
    }

    #[test]
    fn test_nested_length_prefix() {
        let bytes = encode(|w| {
            w.write_nested(3, |inner| {
                inner.write_int32(1, 150);
            })
        });
        assert_eq!(bytes, [0x1a, 0x03, 0x08, 0x96, 0x01]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_field_number_zero_panics() {
        encode(|w| w.write_bool(0, true));
    }

    #[property_test]
    fn proptest_double_bits_roundtrip(value: f64) {
        let bytes = encode(|w| w.write_double(1, value));
        let mut reader = Reader::new(&bytes);
        prop_assert!(reader.next_field().unwrap());
        prop_assert_eq!(reader.read_double().unwrap().to_bits(), value.to_bits());
    }
}
