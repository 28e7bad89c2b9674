//! LEB128 variable-length integer encoding/decoding.
//!
//! Protobuf varints are little-endian base 128: each byte carries 7 bits of
//! payload and the high bit marks that another byte follows. All arithmetic
//! happens on the native integer width.

// The `as` casts here only ever narrow values that were masked to 7 bits.
#![allow(clippy::as_conversions)]

use crate::error::DecodeError;

/// Types that can be encoded as, and decoded from, a LEB128 varint.
pub trait LebCodec: Sized + Copy {
    /// Maximum number of bytes an encoded value may span.
    const MAX_LEB_BYTES: usize;

    /// Decode a varint from the front of `buf`, advancing past it.
    ///
    /// Returns the decoded value and the number of bytes consumed. Running
    /// out of input before the terminating byte, or a final byte carrying
    /// bits that overflow `Self`, are errors.
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<(Self, usize), DecodeError>;

    /// Encode `self` into `buf`, returning the number of bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes required to encode this integer.
    fn encoded_leb128_len(self) -> usize;
}

macro_rules! leb_codec {
    ($ty:ty, $max_bytes:expr, $last_byte_max:expr) => {
        impl LebCodec for $ty {
            const MAX_LEB_BYTES: usize = $max_bytes;

            #[inline]
            fn decode_leb128_buf<B: bytes::Buf>(
                buf: &mut B,
            ) -> Result<(Self, usize), DecodeError> {
                let mut value: $ty = 0;
                for i in 0..Self::MAX_LEB_BYTES {
                    if !buf.has_remaining() {
                        return Err(DecodeError::unexpected_end_of_buffer());
                    }
                    let byte = buf.get_u8();

                    // The final byte may only hold the bits that are left over.
                    if i == Self::MAX_LEB_BYTES - 1 && byte > $last_byte_max {
                        return Err(DecodeError::invalid_varint());
                    }

                    value |= <$ty>::from(byte & 0x7f) << (7 * i);
                    if byte < 0x80 {
                        return Ok((value, i + 1));
                    }
                }
                Err(DecodeError::invalid_varint())
            }

            #[inline]
            fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
                let mut value = self;
                let mut written = 1;
                while value >= 0x80 {
                    buf.put_u8((value as u8 & 0x7f) | 0x80);
                    value >>= 7;
                    written += 1;
                }
                buf.put_u8(value as u8);
                written
            }

            #[inline]
            fn encoded_leb128_len(self) -> usize {
                // ceil(significant_bits / 7), with a minimum of 1 byte for 0.
                let significant_bits = <$ty>::BITS - self.leading_zeros();
                significant_bits.div_ceil(7).max(1) as usize
            }
        }
    };
}

leb_codec!(u64, 10, 0x01);
leb_codec!(u32, 5, 0x0f);
