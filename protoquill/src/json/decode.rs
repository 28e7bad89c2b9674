//! Conversions from canonical JSON values back to protobuf values.
//!
//! Callers only see values that are present, `null` has already been filtered
//! out by [`super::JsonObject::get`].

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{MapKey, Value};
use crate::error::DecodeError;
use crate::message::{JsonCodec, ProtoEnum};

/// Parses any protobuf integer type. Accepts JSON numbers and decimal strings,
/// a value with a fractional part or outside the range of `T` is an error.
fn integer<T: TryFrom<i128>>(value: &Value) -> Result<T, DecodeError> {
    let wide = match value {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                i128::from(n)
            } else if let Some(n) = number.as_u64() {
                i128::from(n)
            } else {
                integral(number.as_f64(), value)?
            }
        }
        Value::String(text) => match text.parse::<i128>() {
            Ok(n) => n,
            // Exponent notation, e.g. "1e3".
            Err(_) => integral(text.parse::<f64>().ok(), value)?,
        },
        _ => return Err(DecodeError::unexpected_json_type("integer")),
    };
    T::try_from(wide).map_err(|_| DecodeError::invalid_number(wide))
}

fn integral(float: Option<f64>, original: &Value) -> Result<i128, DecodeError> {
    match float {
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
        _ => Err(DecodeError::invalid_number(original)),
    }
}

pub fn int32(value: &Value) -> Result<i32, DecodeError> {
    integer(value)
}

pub fn int64(value: &Value) -> Result<i64, DecodeError> {
    integer(value)
}

pub fn uint32(value: &Value) -> Result<u32, DecodeError> {
    integer(value)
}

pub fn uint64(value: &Value) -> Result<u64, DecodeError> {
    integer(value)
}

pub fn double(value: &Value) -> Result<f64, DecodeError> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| DecodeError::invalid_number(number)),
        Value::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => match other.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(f),
                _ => Err(DecodeError::invalid_number(other)),
            },
        },
        _ => Err(DecodeError::unexpected_json_type("number")),
    }
}

/// Like [`double`], but finite values must fit in an `f32`.
pub fn float(value: &Value) -> Result<f32, DecodeError> {
    let wide = double(value)?;
    if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
        return Err(DecodeError::invalid_number(wide));
    }
    Ok(wide as f32)
}

pub fn bool(value: &Value) -> Result<bool, DecodeError> {
    value
        .as_bool()
        .ok_or_else(|| DecodeError::unexpected_json_type("boolean"))
}

pub fn string(value: &Value) -> Result<String, DecodeError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| DecodeError::unexpected_json_type("string"))
}

/// Decodes base64, accepting the URL-safe alphabet and missing padding.
pub fn bytes(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let text = value
        .as_str()
        .ok_or_else(|| DecodeError::unexpected_json_type("string"))?;

    let mut normalized: String = text
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    STANDARD
        .decode(normalized)
        .map_err(|_| DecodeError::InvalidBase64)
}

/// Accepts a value name or any `int32`. Unknown numbers are kept as is.
pub fn enumeration<E: ProtoEnum>(value: &Value) -> Result<i32, DecodeError> {
    match value {
        Value::String(name) => match E::from_str_name(name) {
            Some(known) => Ok(known.to_i32()),
            None => Err(DecodeError::InvalidEnumValue {
                enum_name: E::NAME,
                value: name.clone(),
            }),
        },
        Value::Number(_) => int32(value),
        _ => Err(DecodeError::unexpected_json_type("enum name or number")),
    }
}

pub fn message<M: JsonCodec>(value: &Value) -> Result<M, DecodeError> {
    let mut message = M::default();
    message.merge_json(value)?;
    Ok(message)
}

pub fn merge_message<M: JsonCodec>(message: &mut M, value: &Value) -> Result<(), DecodeError> {
    message.merge_json(value)
}

pub fn array<T>(
    value: &Value,
    f: impl Fn(&Value) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    value
        .as_array()
        .ok_or_else(|| DecodeError::unexpected_json_type("array"))?
        .iter()
        .map(f)
        .collect()
}

pub fn map<K: MapKey, V>(
    value: &Value,
    f: impl Fn(&Value) -> Result<V, DecodeError>,
) -> Result<BTreeMap<K, V>, DecodeError> {
    value
        .as_object()
        .ok_or_else(|| DecodeError::unexpected_json_type("object"))?
        .iter()
        .map(|(key, value)| Ok((K::from_json_key(key)?, f(value)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_integers_accept_numbers_and_strings() {
        assert_eq!(int32(&json!(5)).unwrap(), 5);
        assert_eq!(int32(&json!("-5")).unwrap(), -5);
        assert_eq!(int32(&json!(1e3)).unwrap(), 1000);
        assert_eq!(int64(&json!("-9223372036854775808")).unwrap(), i64::MIN);
        assert_eq!(uint64(&json!("18446744073709551615")).unwrap(), u64::MAX);
        assert_eq!(uint64(&json!(18446744073709551615u64)).unwrap(), u64::MAX);
    }

    #[test]
    fn test_integers_reject_fractions_and_overflow() {
        #[track_caller]
        fn test_case(value: Value) {
            assert!(int32(&value).is_err(), "accepted {value}");
        }

        test_case(json!(1.5));
        test_case(json!("1.5"));
        test_case(json!(2147483648i64));
        test_case(json!("-2147483649"));
        test_case(json!(true));
        test_case(json!("abc"));
        assert!(uint32(&json!(-1)).is_err());
    }

    #[test]
    fn test_floats() {
        assert_eq!(double(&json!(1.25)).unwrap(), 1.25);
        assert_eq!(double(&json!("1.25")).unwrap(), 1.25);
        assert!(double(&json!("NaN")).unwrap().is_nan());
        assert_eq!(float(&json!("-Infinity")).unwrap(), f32::NEG_INFINITY);
        assert!(float(&json!(1e39)).is_err());
        assert!(double(&json!("inf")).is_err());
    }

    #[test]
    fn test_bytes_tolerant_base64() {
        assert_eq!(bytes(&json!("AQI=")).unwrap(), vec![1, 2]);
        assert_eq!(bytes(&json!("AQI")).unwrap(), vec![1, 2]);
        assert_eq!(bytes(&json!("-_8=")).unwrap(), vec![0xfb, 0xff]);
        assert_eq!(bytes(&json!("")).unwrap(), Vec::<u8>::new());
        assert_eq!(bytes(&json!("!!")), Err(DecodeError::InvalidBase64));
    }

    #[test]
    fn test_strict_types() {
        assert!(bool(&json!("true")).is_err());
        assert!(string(&json!(1)).is_err());
        assert!(array(&json!({}), int32).is_err());
    }

    #[test]
    fn test_map() {
        let decoded: BTreeMap<i64, String> =
            map(&json!({"1": "a", "-2": "b"}), string).unwrap();
        assert_eq!(
            decoded,
            BTreeMap::from([(1, "a".to_owned()), (-2, "b".to_owned())])
        );
        assert!(map::<i32, String>(&json!({"x": "a"}), string).is_err());
    }
}
