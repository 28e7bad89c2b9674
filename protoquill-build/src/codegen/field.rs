//! Field model shared by the struct, binary and JSON generators.

use proc_macro2::{Ident, Literal, TokenStream};
use quote::{format_ident, quote};

use protoquill::json::lower_camel_case;

use crate::context::{IdentifierTable, TypeKind};
use crate::descriptor::{FieldDescriptorProto, Type};
use crate::Error;

/// A protobuf scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl Scalar {
    pub fn from_type(r#type: Type) -> Option<Self> {
        Some(match r#type {
            Type::Double => Scalar::Double,
            Type::Float => Scalar::Float,
            Type::Int32 => Scalar::Int32,
            Type::Int64 => Scalar::Int64,
            Type::Uint32 => Scalar::Uint32,
            Type::Uint64 => Scalar::Uint64,
            Type::Sint32 => Scalar::Sint32,
            Type::Sint64 => Scalar::Sint64,
            Type::Fixed32 => Scalar::Fixed32,
            Type::Fixed64 => Scalar::Fixed64,
            Type::Sfixed32 => Scalar::Sfixed32,
            Type::Sfixed64 => Scalar::Sfixed64,
            Type::Bool => Scalar::Bool,
            Type::String => Scalar::String,
            Type::Bytes => Scalar::Bytes,
            Type::Group | Type::Message | Type::Enum => return None,
        })
    }

    pub fn rust_type(self) -> TokenStream {
        match self {
            Scalar::Double => quote!(f64),
            Scalar::Float => quote!(f32),
            Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32 => quote!(i32),
            Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64 => quote!(i64),
            Scalar::Uint32 | Scalar::Fixed32 => quote!(u32),
            Scalar::Uint64 | Scalar::Fixed64 => quote!(u64),
            Scalar::Bool => quote!(bool),
            Scalar::String => quote!(::std::string::String),
            Scalar::Bytes => quote!(::std::vec::Vec<u8>),
        }
    }

    /// Suffix of the `Writer::write_*` and `Reader::read_*` methods.
    pub fn codec_name(self) -> &'static str {
        match self {
            Scalar::Double => "double",
            Scalar::Float => "float",
            Scalar::Int32 => "int32",
            Scalar::Int64 => "int64",
            Scalar::Uint32 => "uint32",
            Scalar::Uint64 => "uint64",
            Scalar::Sint32 => "sint32",
            Scalar::Sint64 => "sint64",
            Scalar::Fixed32 => "fixed32",
            Scalar::Fixed64 => "fixed64",
            Scalar::Sfixed32 => "sfixed32",
            Scalar::Sfixed64 => "sfixed64",
            Scalar::Bool => "bool",
            Scalar::String => "string",
            Scalar::Bytes => "bytes",
        }
    }

    /// Name of the helper in `protoquill::json::{encode, decode}`. The JSON
    /// mapping only depends on the Rust type.
    pub fn json_name(self) -> &'static str {
        match self {
            Scalar::Double => "double",
            Scalar::Float => "float",
            Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32 => "int32",
            Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64 => "int64",
            Scalar::Uint32 | Scalar::Fixed32 => "uint32",
            Scalar::Uint64 | Scalar::Fixed64 => "uint64",
            Scalar::Bool => "bool",
            Scalar::String => "string",
            Scalar::Bytes => "bytes",
        }
    }

    /// Length-delimited types cannot be packed.
    pub fn is_packable(self) -> bool {
        !matches!(self, Scalar::String | Scalar::Bytes)
    }

    fn is_copy(self) -> bool {
        self.is_packable()
    }

    /// Turns `value`, a place when `by_ref` is false and a reference
    /// otherwise, into the argument the codec helpers take.
    pub fn argument(self, value: &TokenStream, by_ref: bool) -> TokenStream {
        match (self.is_copy(), by_ref) {
            (true, true) => quote!(*#value),
            (true, false) | (false, true) => quote!(#value),
            (false, false) => quote!(&#value),
        }
    }

    /// Condition under which an implicit presence field is written.
    pub fn is_set(self, value: &TokenStream) -> TokenStream {
        match self {
            // -0.0 is not the default.
            Scalar::Double | Scalar::Float => quote!(#value.to_bits() != 0),
            Scalar::Bool => quote!(#value),
            Scalar::String | Scalar::Bytes => quote!(!#value.is_empty()),
            _ => quote!(#value != 0),
        }
    }
}

/// The type of a single value of a field.
#[derive(Debug, Clone)]
pub enum ValueKind {
    Scalar(Scalar),
    /// Held as the raw `i32`, so unknown values survive.
    Enum { path: TokenStream },
    Message {
        path: TokenStream,
        partial: TokenStream,
        /// Breaks a recursive type cycle.
        boxed: bool,
    },
}

impl ValueKind {
    /// The Rust type of one value, without a box.
    pub fn rust_type(&self) -> TokenStream {
        match self {
            ValueKind::Scalar(scalar) => scalar.rust_type(),
            ValueKind::Enum { .. } => quote!(i32),
            ValueKind::Message { path, .. } => path.clone(),
        }
    }

    /// The Rust type of one value, boxed when needed.
    pub fn stored_type(&self) -> TokenStream {
        match self {
            ValueKind::Message {
                path, boxed: true, ..
            } => quote!(::std::boxed::Box<#path>),
            _ => self.rust_type(),
        }
    }

    /// The type of one value in a partial.
    pub fn partial_type(&self) -> TokenStream {
        match self {
            ValueKind::Message {
                partial,
                boxed: true,
                ..
            } => quote!(::std::boxed::Box<#partial>),
            ValueKind::Message { partial, .. } => partial.clone(),
            _ => self.rust_type(),
        }
    }

    /// Converts a partial value named `value` into a stored value.
    pub fn initialize(&self, value: &TokenStream) -> TokenStream {
        match self {
            ValueKind::Message {
                path, boxed: true, ..
            } => quote! {
                ::std::boxed::Box::new(<#path as ::protoquill::Message>::initialize(*#value))
            },
            ValueKind::Message { path, .. } => {
                quote!(<#path as ::protoquill::Message>::initialize(#value))
            }
            _ => value.clone(),
        }
    }

    /// Wraps a freshly decoded value for storage.
    pub fn store(&self, value: TokenStream) -> TokenStream {
        match self {
            ValueKind::Message { boxed: true, .. } => quote!(::std::boxed::Box::new(#value)),
            _ => value,
        }
    }

    /// Turns a reference to a stored message into a reference to the message.
    pub fn deref_message(&self, value: &TokenStream) -> TokenStream {
        match self {
            ValueKind::Message { boxed: true, .. } => quote!(&**#value),
            _ => value.clone(),
        }
    }

    /// Mutable counterpart of [`ValueKind::deref_message`].
    pub fn deref_message_mut(&self, value: TokenStream) -> TokenStream {
        match self {
            ValueKind::Message { boxed: true, .. } => quote!(&mut **#value),
            _ => value,
        }
    }
}

/// How many values a field holds and how presence is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Present when not the default value. Also used for oneof members,
    /// whose presence is the oneof's.
    Implicit,
    /// `Option<T>`: singular messages and proto3 `optional` fields.
    Optional,
    Repeated,
    /// `BTreeMap<K, V>` keyed by the scalar.
    Map(Scalar),
}

/// A field resolved against the identifier table.
#[derive(Debug, Clone)]
pub struct Field {
    pub number: u32,
    /// The name declared in the schema.
    pub name: String,
    pub json_name: String,
    pub ident: Ident,
    pub cardinality: Cardinality,
    pub value: ValueKind,
    pub doc: TokenStream,
}

impl Field {
    /// Resolves `field` of the message `message_fqn`, with type paths
    /// relative to `module`.
    pub fn new(
        ctx: &IdentifierTable,
        message_fqn: &str,
        module: &[String],
        field: &FieldDescriptorProto,
        ident: &str,
        in_oneof: bool,
    ) -> Result<Self, Error> {
        let name = field.name.clone().ok_or(Error::MissingName)?;
        let number = field
            .number
            .ok_or_else(|| Error::MissingFieldNumber(name.clone()))?;
        let json_name = field
            .json_name
            .clone()
            .unwrap_or_else(|| lower_camel_case(&name));

        let boxed = ctx.is_recursive_field(message_fqn, &name) && !field.is_repeated();
        let mut map_key = None;
        let value = match field_type(field)? {
            Type::Message if field.is_repeated() => {
                let type_name = type_name(field)?;
                match ctx.map_entry(type_name) {
                    Some(entry) => {
                        let key = field_type(&entry.key)?;
                        map_key = Some(Scalar::from_type(key).ok_or_else(|| {
                            Error::InvalidMapEntry(type_name.to_string())
                        })?);
                        value_kind(ctx, module, &name, &entry.value, false)?
                    }
                    None => value_kind(ctx, module, &name, field, false)?,
                }
            }
            _ => value_kind(ctx, module, &name, field, boxed)?,
        };

        let cardinality = if let Some(key) = map_key {
            Cardinality::Map(key)
        } else if field.is_repeated() {
            Cardinality::Repeated
        } else if in_oneof {
            Cardinality::Implicit
        } else if matches!(value, ValueKind::Message { .. }) || field.is_proto3_optional() {
            Cardinality::Optional
        } else {
            Cardinality::Implicit
        };

        Ok(Field {
            number: number as u32,
            ident: format_ident!("{}", ident),
            name,
            json_name,
            cardinality,
            value,
            doc: TokenStream::new(),
        })
    }

    pub fn with_doc(mut self, doc: TokenStream) -> Self {
        self.doc = doc;
        self
    }

    pub fn number_literal(&self) -> Literal {
        Literal::u32_unsuffixed(self.number)
    }

    /// The type of the struct field.
    pub fn rust_type(&self) -> TokenStream {
        let stored = self.value.stored_type();
        match self.cardinality {
            Cardinality::Implicit => stored,
            Cardinality::Optional => quote!(::std::option::Option<#stored>),
            Cardinality::Repeated => quote!(::std::vec::Vec<#stored>),
            Cardinality::Map(key) => {
                let key = key.rust_type();
                quote!(::std::collections::BTreeMap<#key, #stored>)
            }
        }
    }

    /// The type of the field in the partial struct.
    pub fn partial_type(&self) -> TokenStream {
        let value = self.value.partial_type();
        let inner = match self.cardinality {
            Cardinality::Implicit | Cardinality::Optional => value,
            Cardinality::Repeated => quote!(::std::vec::Vec<#value>),
            Cardinality::Map(key) => {
                let key = key.rust_type();
                quote!(::std::collections::BTreeMap<#key, #value>)
            }
        };
        quote!(::std::option::Option<#inner>)
    }

    /// Statement overlaying `partial.<field>` onto `message`.
    pub fn initialize(&self) -> TokenStream {
        let ident = &self.ident;
        let value = quote!(value);
        let converted = match (&self.cardinality, &self.value) {
            (Cardinality::Implicit, _) => self.value.initialize(&value),
            (Cardinality::Optional, _) => {
                let value = self.value.initialize(&value);
                quote!(::std::option::Option::Some(#value))
            }
            (Cardinality::Repeated, ValueKind::Message { path, .. }) => quote! {
                value.into_iter().map(<#path as ::protoquill::Message>::initialize).collect()
            },
            (Cardinality::Map(_), ValueKind::Message { path, .. }) => quote! {
                value
                    .into_iter()
                    .map(|(key, value)| (key, <#path as ::protoquill::Message>::initialize(value)))
                    .collect()
            },
            (Cardinality::Repeated | Cardinality::Map(_), _) => value,
        };
        quote! {
            if let ::std::option::Option::Some(value) = partial.#ident {
                message.#ident = #converted;
            }
        }
    }
}

fn field_type(field: &FieldDescriptorProto) -> Result<Type, Error> {
    let name = field.name.clone().unwrap_or_default();
    match field.field_type() {
        Some(Type::Group) => Err(Error::GroupsUnsupported(name)),
        Some(r#type) => Ok(r#type),
        None => Err(Error::InvalidFieldType {
            field: name,
            value: field.r#type.unwrap_or(-1),
        }),
    }
}

fn type_name(field: &FieldDescriptorProto) -> Result<&str, Error> {
    field.type_name.as_deref().ok_or_else(|| Error::UnresolvedType {
        field: field.name.clone().unwrap_or_default(),
        type_name: String::new(),
    })
}

/// Resolves the value type of `field`. `name` is the field reported in
/// errors, it differs from the descriptor's for map values.
fn value_kind(
    ctx: &IdentifierTable,
    module: &[String],
    name: &str,
    field: &FieldDescriptorProto,
    boxed: bool,
) -> Result<ValueKind, Error> {
    Ok(match field_type(field)? {
        Type::Message => {
            let type_name = type_name(field)?;
            ValueKind::Message {
                path: ctx.resolve(module, name, type_name, TypeKind::Message)?,
                partial: ctx.resolve_partial(module, name, type_name)?,
                boxed,
            }
        }
        Type::Enum => ValueKind::Enum {
            path: ctx.resolve(module, name, type_name(field)?, TypeKind::Enum)?,
        },
        other => match Scalar::from_type(other) {
            Some(scalar) => ValueKind::Scalar(scalar),
            None => {
                return Err(Error::InvalidFieldType {
                    field: name.to_string(),
                    value: other as i32,
                })
            }
        },
    })
}
