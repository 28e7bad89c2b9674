//! Conversions from protobuf values to their canonical JSON form.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{Map, MapKey, Value};
use crate::error::EncodeError;
use crate::message::{JsonCodec, ProtoEnum};

#[inline]
pub fn int32(value: i32) -> Value {
    Value::from(value)
}

#[inline]
pub fn uint32(value: u32) -> Value {
    Value::from(value)
}

/// 64-bit integers are written as decimal strings, JSON numbers can't
/// represent them exactly.
#[inline]
pub fn int64(value: i64) -> Value {
    Value::String(value.to_string())
}

#[inline]
pub fn uint64(value: u64) -> Value {
    Value::String(value.to_string())
}

#[inline]
pub fn bool(value: bool) -> Value {
    Value::Bool(value)
}

#[inline]
pub fn string(value: &str) -> Value {
    Value::String(value.to_owned())
}

pub fn bytes(value: &[u8]) -> Value {
    Value::String(STANDARD.encode(value))
}

/// Writes the shortest decimal form that parses back to the same `f32`.
pub fn float(value: f32) -> Value {
    match non_finite(f64::from(value)) {
        Some(special) => special,
        // N.B. `f32`'s Display is the shortest round-tripping form, widening
        // first would print the noise digits of the f64 representation.
        None => match value.to_string().parse::<f64>() {
            Ok(shortest) => Value::from(shortest),
            Err(_) => Value::from(f64::from(value)),
        },
    }
}

pub fn double(value: f64) -> Value {
    non_finite(value).unwrap_or_else(|| Value::from(value))
}

fn non_finite(value: f64) -> Option<Value> {
    let name = if value.is_nan() {
        "NaN"
    } else if value == f64::INFINITY {
        "Infinity"
    } else if value == f64::NEG_INFINITY {
        "-Infinity"
    } else {
        return None;
    };
    Some(Value::String(name.to_owned()))
}

/// Writes the value name of a known enum value, the number otherwise.
pub fn enumeration<E: ProtoEnum>(value: i32) -> Value {
    match E::from_i32(value) {
        Some(known) => Value::String(known.as_str_name().to_owned()),
        None => Value::from(value),
    }
}

pub fn message<M: JsonCodec>(value: &M) -> Result<Value, EncodeError> {
    value.to_json()
}

pub fn array<T>(values: &[T], f: impl Fn(&T) -> Value) -> Value {
    Value::Array(values.iter().map(f).collect())
}

pub fn try_array<T>(
    values: &[T],
    f: impl Fn(&T) -> Result<Value, EncodeError>,
) -> Result<Value, EncodeError> {
    let values = values.iter().map(f).collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(values))
}

/// Maps become JSON objects with stringified keys.
pub fn map<K: MapKey, V>(entries: &BTreeMap<K, V>, f: impl Fn(&V) -> Value) -> Value {
    let object: Map<String, Value> = entries
        .iter()
        .map(|(key, value)| (key.to_json_key(), f(value)))
        .collect();
    Value::Object(object)
}

pub fn try_map<K: MapKey, V>(
    entries: &BTreeMap<K, V>,
    f: impl Fn(&V) -> Result<Value, EncodeError>,
) -> Result<Value, EncodeError> {
    let mut object = Map::new();
    for (key, value) in entries {
        object.insert(key.to_json_key(), f(value)?);
    }
    Ok(Value::Object(object))
}
