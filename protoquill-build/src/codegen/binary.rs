//! `BinaryCodec` impls.
//!
//! Fields are written in ascending field number order. Implicit presence
//! fields are skipped when they hold the default value, oneof members are
//! written whenever they are the selected variant.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use super::field::{Cardinality, Field, Scalar, ValueKind};
use super::message::{MessageModel, Slot};

pub fn generate(message: &MessageModel) -> TokenStream {
    let ident = &message.ident;
    let slots = message.slots();

    let writer = if slots.is_empty() {
        format_ident!("_writer")
    } else {
        format_ident!("writer")
    };
    let encode = slots.iter().map(encode_slot);
    let merge = slots.iter().map(merge_slot);

    quote! {
        impl ::protoquill::BinaryCodec for #ident {
            fn encode_fields(&self, #writer: &mut ::protoquill::Writer) {
                #(#encode)*
            }

            fn merge_fields(
                &mut self,
                reader: &mut ::protoquill::Reader<'_>,
            ) -> ::std::result::Result<(), ::protoquill::DecodeError> {
                while reader.next_field()? {
                    match reader.field_number() {
                        #(#merge)*
                        _ => reader.skip_field()?,
                    }
                }
                ::std::result::Result::Ok(())
            }
        }
    }
}

fn encode_slot(slot: &Slot<'_>) -> TokenStream {
    let writer = format_ident!("writer");
    match slot {
        Slot::Field(field) => encode_field(&writer, field),
        Slot::Member(oneof, variant) => {
            let field_ident = &oneof.field;
            let path = &oneof.path;
            let ident = &variant.ident;
            let write = write_value(&writer, variant.field.number, &variant.field.value, &quote!(value), true);
            quote! {
                if let ::std::option::Option::Some(#path::#ident(value)) = &self.#field_ident {
                    #write
                }
            }
        }
    }
}

fn encode_field(writer: &Ident, field: &Field) -> TokenStream {
    let ident = &field.ident;
    let number = field.number;
    let place = quote!(self.#ident);

    match (&field.cardinality, &field.value) {
        (Cardinality::Implicit, ValueKind::Scalar(scalar)) => {
            let condition = scalar.is_set(&place);
            let write = write_value(writer, number, &field.value, &place, false);
            quote! {
                if #condition {
                    #write
                }
            }
        }
        (Cardinality::Implicit, _) => {
            let write = write_value(writer, number, &field.value, &place, false);
            quote! {
                if #place != 0 {
                    #write
                }
            }
        }
        (Cardinality::Optional, _) => {
            let write = write_value(writer, number, &field.value, &quote!(value), true);
            quote! {
                if let ::std::option::Option::Some(value) = &#place {
                    #write
                }
            }
        }
        (Cardinality::Repeated, value) => match packed_codec(value) {
            Some(codec) => {
                let packed = format_ident!("write_packed_{}", codec);
                let number = field.number_literal();
                quote! {
                    if !#place.is_empty() {
                        #writer.#packed(#number, &#place);
                    }
                }
            }
            None => {
                let write = write_value(writer, number, value, &quote!(value), true);
                quote! {
                    for value in &#place {
                        #write
                    }
                }
            }
        },
        (Cardinality::Map(key), _) => {
            let entry = format_ident!("entry");
            let number = field.number_literal();
            let write_key = write_value(&entry, 1, &ValueKind::Scalar(*key), &quote!(key), true);
            let write_value = write_value(&entry, 2, &field.value, &quote!(value), true);
            quote! {
                for (key, value) in &#place {
                    #writer.write_nested(#number, |#entry| {
                        #write_key
                        #write_value
                    });
                }
            }
        }
    }
}

/// Codec of a repeated field that is written packed.
fn packed_codec(value: &ValueKind) -> Option<&'static str> {
    match value {
        ValueKind::Scalar(scalar) if scalar.is_packable() => Some(scalar.codec_name()),
        ValueKind::Enum { .. } => Some(Scalar::Int32.codec_name()),
        _ => None,
    }
}

/// Writes one value. `value` is a reference when `by_ref` is set and a place
/// otherwise.
fn write_value(
    writer: &Ident,
    number: u32,
    value: &ValueKind,
    expr: &TokenStream,
    by_ref: bool,
) -> TokenStream {
    let number = proc_macro2::Literal::u32_unsuffixed(number);
    match value {
        ValueKind::Scalar(scalar) => {
            let write = format_ident!("write_{}", scalar.codec_name());
            let argument = scalar.argument(expr, by_ref);
            quote!(#writer.#write(#number, #argument);)
        }
        ValueKind::Enum { .. } => {
            let argument = Scalar::Int32.argument(expr, by_ref);
            quote!(#writer.write_int32(#number, #argument);)
        }
        ValueKind::Message { .. } => {
            let message = if by_ref {
                value.deref_message(expr)
            } else {
                quote!(&#expr)
            };
            quote!(#writer.write_message(#number, #message);)
        }
    }
}

fn merge_slot(slot: &Slot<'_>) -> TokenStream {
    match slot {
        Slot::Field(field) => {
            let number = field.number_literal();
            let merge = merge_field(field);
            quote! {
                #number => {
                    #merge
                }
            }
        }
        Slot::Member(oneof, variant) => {
            let number = variant.field.number_literal();
            let field_ident = &oneof.field;
            let path = &oneof.path;
            let ident = &variant.ident;
            let value = &variant.field.value;

            let merge = match value {
                ValueKind::Message { .. } => {
                    let rust_type = value.rust_type();
                    let existing = value.deref_message_mut(quote!(value));
                    let stored = value.store(quote!(value));
                    quote! {
                        match &mut self.#field_ident {
                            ::std::option::Option::Some(#path::#ident(value)) => {
                                reader.read_message(#existing)?;
                            }
                            _ => {
                                let mut value: #rust_type = ::std::default::Default::default();
                                reader.read_message(&mut value)?;
                                self.#field_ident = ::std::option::Option::Some(#path::#ident(#stored));
                            }
                        }
                    }
                }
                _ => {
                    let read = read_value(&format_ident!("reader"), value);
                    quote! {
                        self.#field_ident = ::std::option::Option::Some(#path::#ident(#read));
                    }
                }
            };
            quote! {
                #number => {
                    #merge
                }
            }
        }
    }
}

fn merge_field(field: &Field) -> TokenStream {
    let reader = format_ident!("reader");
    let ident = &field.ident;
    let value = &field.value;

    match (&field.cardinality, value) {
        (Cardinality::Implicit, _) => {
            let read = read_value(&reader, value);
            quote!(self.#ident = #read;)
        }
        (Cardinality::Optional, ValueKind::Message { .. }) => {
            let target = value.deref_message_mut(quote! {
                self.#ident.get_or_insert_with(::std::default::Default::default)
            });
            quote!(reader.read_message(#target)?;)
        }
        (Cardinality::Optional, _) => {
            let read = read_value(&reader, value);
            quote!(self.#ident = ::std::option::Option::Some(#read);)
        }
        (Cardinality::Repeated, ValueKind::Message { .. }) => {
            let rust_type = value.rust_type();
            quote! {
                let mut value: #rust_type = ::std::default::Default::default();
                reader.read_message(&mut value)?;
                self.#ident.push(value);
            }
        }
        (Cardinality::Repeated, _) => match packed_codec(value) {
            Some(codec) => {
                let read = format_ident!("read_repeated_{}", codec);
                quote!(reader.#read(&mut self.#ident)?;)
            }
            None => {
                let read = read_value(&reader, value);
                quote!(self.#ident.push(#read);)
            }
        },
        (Cardinality::Map(key), _) => {
            let entry = format_ident!("entry");
            let key_type = key.rust_type();
            let value_type = value.rust_type();
            let read_key = read_value(&entry, &ValueKind::Scalar(*key));
            let read_value = match value {
                ValueKind::Message { .. } => quote!(#entry.read_message(&mut value)?),
                _ => {
                    let read = read_value(&entry, value);
                    quote!(value = #read)
                }
            };
            quote! {
                let (key, value) = reader.read_nested(|#entry| {
                    let mut key: #key_type = ::std::default::Default::default();
                    let mut value: #value_type = ::std::default::Default::default();
                    while #entry.next_field()? {
                        match #entry.field_number() {
                            1 => key = #read_key,
                            2 => #read_value,
                            _ => #entry.skip_field()?,
                        }
                    }
                    ::std::result::Result::Ok((key, value))
                })?;
                self.#ident.insert(key, value);
            }
        }
    }
}

/// Expression reading one non-message value.
fn read_value(reader: &Ident, value: &ValueKind) -> TokenStream {
    let codec = match value {
        ValueKind::Scalar(scalar) => scalar.codec_name(),
        ValueKind::Enum { .. } => Scalar::Int32.codec_name(),
        // Messages are merged in place.
        ValueKind::Message { .. } => "message",
    };
    let read = format_ident!("read_{}", codec);
    quote!(#reader.#read()?)
}
