//! `JsonCodec` impls following the canonical JSON mapping.

use proc_macro2::TokenStream;
use quote::quote;

use super::field::{Cardinality, Field, Scalar, ValueKind};
use super::message::{MessageModel, Slot};
use super::oneof::Oneof;

pub fn generate(message: &MessageModel) -> TokenStream {
    let ident = &message.ident;
    let slots = message.slots();

    let to_json = if slots.is_empty() {
        quote!(::std::result::Result::Ok(::protoquill::json::JsonWriter::new().finish()))
    } else {
        let inserts = slots.iter().map(encode_slot);
        quote! {
            let mut object = ::protoquill::json::JsonWriter::new();
            #(#inserts)*
            ::std::result::Result::Ok(object.finish())
        }
    };

    let merge_json = if slots.is_empty() {
        quote! {
            ::protoquill::json::JsonObject::new(value)?;
            ::std::result::Result::Ok(())
        }
    } else {
        let fields = message.fields.iter().map(merge_field);
        let oneofs = message.oneofs.iter().map(merge_oneof);
        quote! {
            let object = ::protoquill::json::JsonObject::new(value)?;
            #(#fields)*
            #(#oneofs)*
            ::std::result::Result::Ok(())
        }
    };

    quote! {
        impl ::protoquill::JsonCodec for #ident {
            fn to_json(
                &self,
            ) -> ::std::result::Result<::protoquill::json::Value, ::protoquill::EncodeError> {
                #to_json
            }

            fn merge_json(
                &mut self,
                value: &::protoquill::json::Value,
            ) -> ::std::result::Result<(), ::protoquill::DecodeError> {
                #merge_json
            }
        }
    }
}

fn encode_slot(slot: &Slot<'_>) -> TokenStream {
    match slot {
        Slot::Field(field) => encode_field(field),
        Slot::Member(oneof, variant) => {
            let field_ident = &oneof.field;
            let path = &oneof.path;
            let ident = &variant.ident;
            let json_name = &variant.field.json_name;
            let value = to_value(&variant.field.value, &quote!(value), true);
            quote! {
                if let ::std::option::Option::Some(#path::#ident(value)) = &self.#field_ident {
                    object.insert(#json_name, #value);
                }
            }
        }
    }
}

fn encode_field(field: &Field) -> TokenStream {
    let ident = &field.ident;
    let json_name = &field.json_name;
    let place = quote!(self.#ident);

    match (&field.cardinality, &field.value) {
        (Cardinality::Implicit, value) => {
            let condition = match value {
                ValueKind::Scalar(scalar) => scalar.is_set(&place),
                _ => quote!(#place != 0),
            };
            let value = to_value(value, &place, false);
            quote! {
                if #condition {
                    object.insert(#json_name, #value);
                }
            }
        }
        (Cardinality::Optional, value) => {
            let value = to_value(value, &quote!(value), true);
            quote! {
                if let ::std::option::Option::Some(value) = &#place {
                    object.insert(#json_name, #value);
                }
            }
        }
        (Cardinality::Repeated, value) => {
            let array = match value {
                ValueKind::Message { path, .. } => quote! {
                    ::protoquill::json::encode::try_array(
                        &#place,
                        ::protoquill::json::encode::message::<#path>,
                    )?
                },
                _ => {
                    let element = to_value(value, &quote!(value), true);
                    quote!(::protoquill::json::encode::array(&#place, |value| #element))
                }
            };
            quote! {
                if !#place.is_empty() {
                    object.insert(#json_name, #array);
                }
            }
        }
        (Cardinality::Map(_), value) => {
            let map = match value {
                ValueKind::Message { path, .. } => quote! {
                    ::protoquill::json::encode::try_map(
                        &#place,
                        ::protoquill::json::encode::message::<#path>,
                    )?
                },
                _ => {
                    let element = to_value(value, &quote!(value), true);
                    quote!(::protoquill::json::encode::map(&#place, |value| #element))
                }
            };
            quote! {
                if !#place.is_empty() {
                    object.insert(#json_name, #map);
                }
            }
        }
    }
}

/// Converts one value to JSON. `expr` is a reference when `by_ref` is set and
/// a place otherwise.
fn to_value(value: &ValueKind, expr: &TokenStream, by_ref: bool) -> TokenStream {
    match value {
        ValueKind::Scalar(scalar) => {
            let encode = quote::format_ident!("{}", scalar.json_name());
            let argument = scalar.argument(expr, by_ref);
            quote!(::protoquill::json::encode::#encode(#argument))
        }
        ValueKind::Enum { path } => {
            let argument = Scalar::Int32.argument(expr, by_ref);
            quote!(::protoquill::json::encode::enumeration::<#path>(#argument))
        }
        ValueKind::Message { .. } => {
            let message = if by_ref {
                value.deref_message(expr)
            } else {
                quote!(&#expr)
            };
            quote!(::protoquill::json::encode::message(#message)?)
        }
    }
}

/// Path of the function decoding one value from JSON.
fn decoder(value: &ValueKind) -> TokenStream {
    match value {
        ValueKind::Scalar(scalar) => {
            let decode = quote::format_ident!("{}", scalar.json_name());
            quote!(::protoquill::json::decode::#decode)
        }
        ValueKind::Enum { path } => quote!(::protoquill::json::decode::enumeration::<#path>),
        ValueKind::Message { path, .. } => quote!(::protoquill::json::decode::message::<#path>),
    }
}

fn merge_field(field: &Field) -> TokenStream {
    let ident = &field.ident;
    let json_name = &field.json_name;
    let proto_name = &field.name;
    let decode = decoder(&field.value);

    let assign = match (&field.cardinality, &field.value) {
        (Cardinality::Implicit, _) => quote!(self.#ident = #decode(value)?;),
        (Cardinality::Optional, ValueKind::Message { .. }) => {
            let target = field.value.deref_message_mut(quote! {
                self.#ident.get_or_insert_with(::std::default::Default::default)
            });
            quote!(::protoquill::json::decode::merge_message(#target, value)?;)
        }
        (Cardinality::Optional, _) => {
            quote!(self.#ident = ::std::option::Option::Some(#decode(value)?);)
        }
        (Cardinality::Repeated, _) => {
            quote!(self.#ident.extend(::protoquill::json::decode::array(value, #decode)?);)
        }
        (Cardinality::Map(key), value) => {
            let key_type = key.rust_type();
            let value_type = value.rust_type();
            quote! {
                self.#ident.extend(
                    ::protoquill::json::decode::map::<#key_type, #value_type>(value, #decode)?,
                );
            }
        }
    };

    quote! {
        if let ::std::option::Option::Some(value) = object.get(#json_name, #proto_name)? {
            #assign
        }
    }
}

/// Decodes the members of a oneof, at most one of which may be present.
fn merge_oneof(oneof: &Oneof) -> TokenStream {
    let field_ident = &oneof.field;
    let path = &oneof.path;
    let name = &oneof.name;

    let members = oneof.variants.iter().map(|variant| {
        let ident = &variant.ident;
        let json_name = &variant.field.json_name;
        let proto_name = &variant.field.name;
        let decode = decoder(&variant.field.value);
        let stored = variant.field.value.store(quote!(#decode(value)?));
        quote! {
            if let ::std::option::Option::Some(value) = object.get(#json_name, #proto_name)? {
                if choice.is_some() {
                    return ::std::result::Result::Err(
                        ::protoquill::DecodeError::conflicting_oneof(#name),
                    );
                }
                choice = ::std::option::Option::Some(#path::#ident(#stored));
            }
        }
    });

    quote! {
        {
            let mut choice: ::std::option::Option<#path> = ::std::option::Option::None;
            #(#members)*
            if let ::std::option::Option::Some(choice) = choice {
                self.#field_ident = ::std::option::Option::Some(choice);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::block;
    use quote::format_ident;

    fn field(name: &str, json_name: &str, cardinality: Cardinality, value: ValueKind) -> Field {
        Field {
            number: 1,
            name: name.to_string(),
            json_name: json_name.to_string(),
            ident: format_ident!("{}", name),
            cardinality,
            value,
            doc: TokenStream::new(),
        }
    }

    #[test]
    fn test_implicit_enum_by_name() {
        let size = field(
            "hat_size",
            "hatSize",
            Cardinality::Implicit,
            ValueKind::Enum { path: quote!(Size) },
        );
        let expected = quote! {
            if self.hat_size != 0 {
                object.insert(
                    "hatSize",
                    ::protoquill::json::encode::enumeration::<Size>(self.hat_size)
                );
            }
        };
        assert_eq!(block(encode_field(&size)), block(expected));
    }

    #[test]
    fn test_accepts_both_names() {
        let labels = field(
            "labels",
            "labels",
            Cardinality::Map(Scalar::String),
            ValueKind::Scalar(Scalar::Sfixed64),
        );
        let expected = quote! {
            if let ::std::option::Option::Some(value) = object.get("labels", "labels")? {
                self.labels.extend(
                    ::protoquill::json::decode::map::<::std::string::String, i64>(
                        value,
                        ::protoquill::json::decode::int64
                    )?,
                );
            }
        };
        assert_eq!(block(merge_field(&labels)), block(expected));
    }
}
