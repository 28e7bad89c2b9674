//! Oneof enums.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::context::{field_ident, is_oneof_member, IdentifierTable, OneofNames};
use crate::descriptor::{DescriptorProto, FieldDescriptorProto, OneofDescriptorProto};
use crate::Error;

use super::field::Field;

/// A oneof declared in source, with its members in declaration order.
#[derive(Debug)]
pub struct OneofInfo<'a> {
    pub oneof: &'a OneofDescriptorProto,
    pub fields: Vec<&'a FieldDescriptorProto>,
    /// Index into `oneof_decl`.
    pub index: usize,
}

/// Collects the oneofs of `message`. The synthetic oneofs of proto3
/// `optional` fields are left out, so are oneofs without members.
pub fn collect_oneofs(message: &DescriptorProto) -> Vec<OneofInfo<'_>> {
    message
        .oneof_decl
        .iter()
        .enumerate()
        .filter_map(|(index, oneof)| {
            let fields: Vec<_> = message
                .field
                .iter()
                .filter(|f| is_oneof_member(f) && f.oneof_index == Some(index as i32))
                .collect();
            (!fields.is_empty()).then_some(OneofInfo {
                oneof,
                fields,
                index,
            })
        })
        .collect()
}

/// One member of a oneof.
#[derive(Debug)]
pub struct Variant {
    pub ident: Ident,
    /// Resolved from the module of the message.
    pub field: Field,
    /// Payload type, resolved from the module holding the enum.
    pub payload: TokenStream,
}

/// A oneof resolved against the identifier table.
#[derive(Debug)]
pub struct Oneof {
    pub name: String,
    /// The struct field holding the `Option<enum>`.
    pub field: Ident,
    pub ident: Ident,
    /// Path of the enum from the module of the message.
    pub path: TokenStream,
    pub variants: Vec<Variant>,
    pub doc: TokenStream,
}

impl Oneof {
    /// `module` is the module of the message, `nested` the one of its nested
    /// types.
    pub fn new(
        ctx: &IdentifierTable,
        message_fqn: &str,
        module: &[String],
        nested: &[String],
        info: &OneofInfo<'_>,
        names: &OneofNames,
    ) -> Result<Self, Error> {
        let name = info.oneof.name.clone().ok_or(Error::MissingName)?;
        let module_ident = nested.last().map(|m| format_ident!("{}", m));
        let ident = format_ident!("{}", names.ident);

        let mut variants = Vec::with_capacity(info.fields.len());
        for field in &info.fields {
            let number = field.number.unwrap_or_default();
            let Some(variant) = names.variants.get(&number) else {
                continue;
            };
            let field_name = field_ident(field.name.as_deref().ok_or(Error::MissingName)?);
            let outer = Field::new(ctx, message_fqn, module, field, &field_name, true)?;
            let inner = Field::new(ctx, message_fqn, nested, field, &field_name, true)?;
            variants.push(Variant {
                ident: format_ident!("{}", variant),
                field: outer,
                payload: inner.rust_type(),
            });
        }

        Ok(Oneof {
            name,
            field: format_ident!("{}", names.field),
            path: quote!(#module_ident::#ident),
            ident,
            variants,
            doc: TokenStream::new(),
        })
    }

    pub fn with_doc(mut self, doc: TokenStream) -> Self {
        self.doc = doc;
        self
    }

    /// The type of the struct field.
    pub fn rust_type(&self) -> TokenStream {
        let path = &self.path;
        quote!(::std::option::Option<#path>)
    }

    /// The enum, emitted into the nested module of the message.
    pub fn generate(&self) -> TokenStream {
        let ident = &self.ident;
        let doc = &self.doc;
        let variants = self.variants.iter().map(|variant| {
            let ident = &variant.ident;
            let payload = &variant.payload;
            let doc = &variant.field.doc;
            quote! {
                #doc
                #ident(#payload),
            }
        });

        quote! {
            #doc
            #[derive(Debug, Clone, PartialEq)]
            pub enum #ident {
                #(#variants)*
            }
        }
    }
}
