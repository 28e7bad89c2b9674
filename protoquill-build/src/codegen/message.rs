//! Generation of message structs and their impls.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::context::{is_oneof_member, IdentifierTable, RustPath};
use crate::descriptor::DescriptorProto;
use crate::Error;

use super::comments::{CommentMap, DescriptorPath};
use super::field::Field;
use super::oneof::{collect_oneofs, Oneof, Variant};
use super::{binary, enumeration, json};

/// A field slot of a message, in wire order.
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    Field(&'a Field),
    Member(&'a Oneof, &'a Variant),
}

impl Slot<'_> {
    fn number(&self) -> u32 {
        match self {
            Slot::Field(field) => field.number,
            Slot::Member(_, variant) => variant.field.number,
        }
    }
}

/// A message resolved against the identifier table.
#[derive(Debug)]
pub struct MessageModel {
    /// e.g. `.shop.Hat`
    pub fqn: String,
    pub ident: Ident,
    pub partial: Ident,
    /// Non-oneof fields in declaration order.
    pub fields: Vec<Field>,
    pub oneofs: Vec<Oneof>,
    pub doc: TokenStream,
}

impl MessageModel {
    /// Resolves `message`, whose items are emitted into `module`.
    pub fn new(
        ctx: &IdentifierTable,
        fqn: &str,
        module: &[String],
        message: &DescriptorProto,
        comments: &CommentMap,
        path: &DescriptorPath,
    ) -> Result<Self, Error> {
        let names = ctx.message(fqn).ok_or_else(|| Error::UnresolvedType {
            field: String::new(),
            type_name: fqn.to_string(),
        })?;

        let mut fields = Vec::new();
        for (index, field) in message.field.iter().enumerate() {
            if is_oneof_member(field) {
                continue;
            }
            let Some(ident) = field.number.and_then(|number| names.fields.get(&number)) else {
                continue;
            };
            let doc = comments.doc(&path.field(index));
            fields.push(Field::new(ctx, fqn, module, field, ident, false)?.with_doc(doc));
        }

        let mut nested = module.to_vec();
        nested.push(names.module.clone());
        let mut oneofs = Vec::new();
        for info in collect_oneofs(message) {
            let Some(oneof_names) = names.oneofs.get(&info.index) else {
                continue;
            };
            let doc = comments.doc(&path.oneof(info.index));
            let mut oneof = Oneof::new(ctx, fqn, module, &nested, &info, oneof_names)?.with_doc(doc);
            for variant in &mut oneof.variants {
                let index = message
                    .field
                    .iter()
                    .position(|f| f.number == Some(variant.field.number as i32) && is_oneof_member(f));
                if let Some(index) = index {
                    variant.field.doc = comments.doc(&path.field(index));
                }
            }
            oneofs.push(oneof);
        }

        Ok(MessageModel {
            fqn: fqn.to_string(),
            ident: format_ident!("{}", names.ident),
            partial: format_ident!("{}", names.partial),
            fields,
            oneofs,
            doc: comments.doc(path),
        })
    }

    /// Every field and oneof member, by ascending field number.
    pub fn slots(&self) -> Vec<Slot<'_>> {
        let mut slots: Vec<Slot<'_>> = self.fields.iter().map(Slot::Field).collect();
        for oneof in &self.oneofs {
            slots.extend(oneof.variants.iter().map(|variant| Slot::Member(oneof, variant)));
        }
        slots.sort_by_key(Slot::number);
        slots
    }

    fn generate_struct(&self) -> TokenStream {
        let ident = &self.ident;
        let partial = &self.partial;
        let doc = &self.doc;

        let fields = self.fields.iter().map(|field| {
            let doc = &field.doc;
            let ident = &field.ident;
            let rust_type = field.rust_type();
            quote! {
                #doc
                pub #ident: #rust_type,
            }
        });
        let oneofs = self.oneofs.iter().map(|oneof| {
            let doc = &oneof.doc;
            let ident = &oneof.field;
            let rust_type = oneof.rust_type();
            quote! {
                #doc
                pub #ident: #rust_type,
            }
        });

        let partial_fields = self.fields.iter().map(|field| {
            let ident = &field.ident;
            let rust_type = field.partial_type();
            quote!(pub #ident: #rust_type,)
        });
        let partial_oneofs = self.oneofs.iter().map(|oneof| {
            let ident = &oneof.field;
            let rust_type = oneof.rust_type();
            quote!(pub #ident: #rust_type,)
        });
        let partial_doc = format!(" Partial form of [`{}`], accepted by `initialize`.", ident);

        quote! {
            #doc
            #[derive(Debug, Clone, Default, PartialEq)]
            pub struct #ident {
                #(#fields)*
                #(#oneofs)*
            }

            #[doc = #partial_doc]
            #[derive(Debug, Clone, Default, PartialEq)]
            pub struct #partial {
                #(#partial_fields)*
                #(#partial_oneofs)*
            }
        }
    }

    fn generate_message_impl(&self) -> TokenStream {
        let ident = &self.ident;
        let partial = &self.partial;
        let name = self.fqn.trim_start_matches('.');

        let initialize = if self.fields.is_empty() && self.oneofs.is_empty() {
            quote! {
                fn initialize(_partial: #partial) -> Self {
                    Self::default()
                }
            }
        } else {
            let fields = self.fields.iter().map(Field::initialize);
            let oneofs = self.oneofs.iter().map(|oneof| {
                let ident = &oneof.field;
                quote! {
                    if let ::std::option::Option::Some(value) = partial.#ident {
                        message.#ident = ::std::option::Option::Some(value);
                    }
                }
            });
            quote! {
                fn initialize(partial: #partial) -> Self {
                    let mut message = Self::default();
                    #(#fields)*
                    #(#oneofs)*
                    message
                }
            }
        };

        quote! {
            impl ::protoquill::Message for #ident {
                const NAME: &'static str = #name;

                type Partial = #partial;

                #initialize
            }
        }
    }
}

/// Generates `message` and everything nested in it. Items go into `module`,
/// nested types into a module named after the message.
pub fn generate(
    ctx: &IdentifierTable,
    fqn: &str,
    module: &[String],
    message: &DescriptorProto,
    comments: &CommentMap,
    path: &DescriptorPath,
) -> Result<TokenStream, Error> {
    let Some(names) = ctx.message(fqn) else {
        // Map entries.
        return Ok(TokenStream::new());
    };
    let generated = matches!(
        ctx.type_info(fqn).map(|info| &info.path),
        Some(RustPath::Generated { .. })
    );

    let mut items = TokenStream::new();
    let mut nested_items = TokenStream::new();

    if generated {
        let model = MessageModel::new(ctx, fqn, module, message, comments, path)?;
        items.extend(model.generate_struct());
        items.extend(model.generate_message_impl());
        items.extend(binary::generate(&model));
        items.extend(json::generate(&model));
        for oneof in &model.oneofs {
            nested_items.extend(oneof.generate());
        }
    }

    let mut nested = module.to_vec();
    nested.push(names.module.clone());

    for (index, enum_type) in message.enum_type.iter().enumerate() {
        let name = enum_type.name.as_deref().ok_or(Error::MissingName)?;
        let enum_fqn = format!("{fqn}.{name}");
        let (Some(info), Some(enum_names)) = (ctx.type_info(&enum_fqn), ctx.enumeration(&enum_fqn)) else {
            continue;
        };
        if matches!(info.path, RustPath::Generated { .. }) {
            nested_items.extend(enumeration::generate(
                &enum_fqn,
                enum_type,
                enum_names,
                comments,
                &path.nested_enum(index),
            )?);
        }
    }

    for (index, nested_message) in message.nested_type.iter().enumerate() {
        if nested_message.is_map_entry() {
            continue;
        }
        let name = nested_message.name.as_deref().ok_or(Error::MissingName)?;
        nested_items.extend(generate(
            ctx,
            &format!("{fqn}.{name}"),
            &nested,
            nested_message,
            comments,
            &path.nested_message(index),
        )?);
    }

    if !nested_items.is_empty() {
        let module_ident = format_ident!("{}", names.module);
        items.extend(quote! {
            pub mod #module_ident {
                #nested_items
            }
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{reprint, syntax};
    use crate::config::Config;
    use crate::descriptor::builder::*;

    fn model(message: DescriptorProto) -> MessageModel {
        let file = FileDescriptorProto::new("shop.proto", "shop").with_message(message.clone());
        let table = IdentifierTable::new(&Config::new(), &FileDescriptorSet { file: vec![file] })
            .unwrap();
        MessageModel::new(
            &table,
            ".shop.Hat",
            &["shop".to_string()],
            &message,
            &CommentMap::default(),
            &DescriptorPath::message(0),
        )
        .unwrap()
    }

    #[test]
    fn test_slots_in_number_order() {
        let hat = DescriptorProto::new("Hat")
            .with_field(FieldDescriptorProto::scalar("color", 3, Type::String))
            .with_oneof(
                "size",
                vec![
                    FieldDescriptorProto::scalar("inches", 4, Type::Int32),
                    FieldDescriptorProto::scalar("small", 1, Type::Bool),
                ],
            )
            .with_field(FieldDescriptorProto::scalar("name", 2, Type::String));

        let model = model(hat);
        let numbers: Vec<u32> = model.slots().iter().map(Slot::number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(model.fields.len(), 2);
        assert_eq!(
            syntax::<syn::Path>(model.oneofs[0].path.clone()),
            syntax::<syn::Path>(quote!(hat::Size))
        );
    }

    #[test]
    fn test_empty_message_initialize() {
        let model = model(DescriptorProto::new("Hat"));
        let code = reprint::<syn::ItemImpl>(model.generate_message_impl());
        assert!(code.contains(&reprint::<syn::Signature>(quote!(
            fn initialize(_partial: HatPartial) -> Self
        ))));
        assert!(code.contains(&reprint::<syn::ImplItem>(quote!(
            const NAME: &'static str = "shop.Hat";
        ))));
    }

    #[test]
    fn test_nested_types_get_a_module() {
        let hat = DescriptorProto::new("Hat")
            .with_nested(DescriptorProto::new("Brim"))
            .with_enum(EnumDescriptorProto::new("Fit", &[("FIT_UNSPECIFIED", 0)]));
        let file = FileDescriptorProto::new("shop.proto", "shop").with_message(hat.clone());
        let table = IdentifierTable::new(&Config::new(), &FileDescriptorSet { file: vec![file] })
            .unwrap();

        let code = generate(
            &table,
            ".shop.Hat",
            &["shop".to_string()],
            &hat,
            &CommentMap::default(),
            &DescriptorPath::message(0),
        )
        .unwrap();
        let file: syn::File = syn::parse2(code).unwrap();
        let module = file
            .items
            .iter()
            .find_map(|item| match item {
                syn::Item::Mod(module) if module.ident == "hat" => Some(module),
                _ => None,
            })
            .unwrap();
        let (_, items) = module.content.as_ref().unwrap();
        let names: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                syn::Item::Struct(s) => Some(s.ident.to_string()),
                syn::Item::Enum(e) => Some(e.ident.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Fit", "Brim", "BrimPartial"]);
    }
}
