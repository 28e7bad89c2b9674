//! Canonical protobuf JSON mapping.
//!
//! See <https://protobuf.dev/programming-guides/json/>. Generated code decides
//! per field whether it is present; the helpers in [`encode`] and [`decode`]
//! convert individual values.

pub mod decode;
pub mod encode;

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
pub use serde_json::{Map, Number, Value};

use crate::error::DecodeError;

/// Parses JSON text into a [`Value`], rejecting any object that repeats a key.
///
/// `serde_json` keeps the last of a repeated key; a repeated message field or
/// map key is a decode error here instead.
pub fn parse(text: &str) -> Result<Value, DecodeError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let value = (&mut deserializer).deserialize_any(UniqueKeys)?;
    deserializer.end()?;
    Ok(value)
}

/// Builds a [`Value`] the way `serde_json` does, minus the silent overwrite.
struct UniqueKeys;

impl<'de> Visitor<'de> for UniqueKeys {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element_seed(Seed)? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key `{key}`")));
            }
            let value = map.next_value_seed(Seed)?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

/// Nested values go through [`UniqueKeys`] as well.
struct Seed;

impl<'de> de::DeserializeSeed<'de> for Seed {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(UniqueKeys)
    }
}

/// Accumulates the members of a JSON object in insertion order.
///
/// Generated code inserts fields in ascending field number order.
#[derive(Debug, Default)]
pub struct JsonWriter {
    object: Map<String, Value>,
}

impl JsonWriter {
    pub fn new() -> Self {
        JsonWriter::default()
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.object.insert(key.to_owned(), value);
    }

    pub fn finish(self) -> Value {
        Value::Object(self.object)
    }
}

/// Read access to the members of a JSON object that tolerates both the JSON
/// name and the original proto name of a field.
#[derive(Debug, Clone, Copy)]
pub struct JsonObject<'a> {
    object: &'a Map<String, Value>,
}

impl<'a> JsonObject<'a> {
    pub fn new(value: &'a Value) -> Result<Self, DecodeError> {
        match value {
            Value::Object(object) => Ok(JsonObject { object }),
            _ => Err(DecodeError::unexpected_json_type("object")),
        }
    }

    /// Looks up a field by either of its names. `null` counts as absent.
    ///
    /// Supplying a field under both names is an error. A key repeated verbatim
    /// never reaches this point, [`parse`] rejects it.
    pub fn get(
        &self,
        json_name: &'static str,
        proto_name: &'static str,
    ) -> Result<Option<&'a Value>, DecodeError> {
        let object = self.object;
        let lookup = |name: &str| object.get(name).filter(|value| !value.is_null());

        let by_json_name = lookup(json_name);
        let by_proto_name = if proto_name == json_name {
            None
        } else {
            lookup(proto_name)
        };

        match (by_json_name, by_proto_name) {
            (Some(_), Some(_)) => Err(DecodeError::duplicate_field(proto_name)),
            (Some(value), None) | (None, Some(value)) => Ok(Some(value)),
            (None, None) => Ok(None),
        }
    }
}

/// Types that can be the key of a protobuf map.
///
/// JSON object keys are always strings, so integer and bool keys are
/// stringified.
pub trait MapKey: Ord + Sized {
    fn to_json_key(&self) -> String;

    fn from_json_key(key: &str) -> Result<Self, DecodeError>;
}

impl MapKey for String {
    fn to_json_key(&self) -> String {
        self.clone()
    }

    fn from_json_key(key: &str) -> Result<Self, DecodeError> {
        Ok(key.to_owned())
    }
}

impl MapKey for bool {
    fn to_json_key(&self) -> String {
        self.to_string()
    }

    fn from_json_key(key: &str) -> Result<Self, DecodeError> {
        match key {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(DecodeError::invalid_number(other)),
        }
    }
}

macro_rules! integer_map_key {
    ($($ty:ty),*) => {
        $(
            impl MapKey for $ty {
                fn to_json_key(&self) -> String {
                    self.to_string()
                }

                fn from_json_key(key: &str) -> Result<Self, DecodeError> {
                    key.parse().map_err(|_| DecodeError::invalid_number(key))
                }
            }
        )*
    };
}

integer_map_key!(i32, i64, u32, u64);

/// Converts a proto field name into its lowerCamelCase JSON name, the same way
/// protoc fills in `json_name`.
pub fn lower_camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
