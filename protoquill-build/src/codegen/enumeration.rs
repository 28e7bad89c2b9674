//! Generation of Rust enums for protobuf enums.

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::context::EnumNames;
use crate::descriptor::EnumDescriptorProto;
use crate::Error;

use super::comments::{CommentMap, DescriptorPath};

/// Generates the enum, its `ProtoEnum` impl and a `Default` impl.
///
/// Fields of enum type hold the raw `i32`, so the Rust enum only needs the
/// known values. Aliases share the variant of the first value with their
/// number and are only accepted by `from_str_name`.
pub fn generate(
    fqn: &str,
    enum_type: &EnumDescriptorProto,
    names: &EnumNames,
    comments: &CommentMap,
    path: &DescriptorPath,
) -> Result<TokenStream, Error> {
    let ident = format_ident!("{}", names.ident);
    let full_name = fqn.trim_start_matches('.');
    let doc = comments.doc(path);

    let mut variants = Vec::new();
    let mut from_i32 = Vec::new();
    let mut from_str = Vec::new();
    let mut as_str = Vec::new();
    let mut zero = None;
    let mut first = None;

    for (index, (value, value_names)) in enum_type.value.iter().zip(&names.values).enumerate() {
        let name = value.name.as_deref().ok_or(Error::MissingName)?;
        let number = value
            .number
            .ok_or_else(|| Error::MissingFieldNumber(name.to_string()))?;
        let variant = format_ident!("{}", value_names.ident);
        let literal = int_literal(number);

        from_str.push(quote!(#name => ::std::option::Option::Some(Self::#variant),));
        if !value_names.canonical {
            continue;
        }

        let value_doc = comments.doc(&path.enum_value(index));
        variants.push(quote! {
            #value_doc
            #variant = #literal,
        });
        from_i32.push(quote!(#literal => ::std::option::Option::Some(Self::#variant),));
        as_str.push(quote!(Self::#variant => #name,));
        if number == 0 {
            zero = Some(variant.clone());
        }
        first.get_or_insert(variant);
    }

    // Proto3 requires the first value to be zero, the first value stands in
    // for schemas that do not.
    let default_impl = zero.or(first).map(|variant| {
        quote! {
            impl ::std::default::Default for #ident {
                fn default() -> Self {
                    Self::#variant
                }
            }
        }
    });

    // An enum without values has no instances and cannot be `repr(i32)`.
    let (repr, to_i32) = if variants.is_empty() {
        (None, quote!(match self {}))
    } else {
        (Some(quote!(#[repr(i32)])), quote!(self as i32))
    };

    Ok(quote! {
        #doc
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #repr
        pub enum #ident {
            #(#variants)*
        }

        impl ::protoquill::ProtoEnum for #ident {
            const NAME: &'static str = #full_name;

            fn from_i32(value: i32) -> ::std::option::Option<Self> {
                match value {
                    #(#from_i32)*
                    _ => ::std::option::Option::None,
                }
            }

            fn from_str_name(name: &str) -> ::std::option::Option<Self> {
                match name {
                    #(#from_str)*
                    _ => ::std::option::Option::None,
                }
            }

            fn as_str_name(&self) -> &'static str {
                match *self {
                    #(#as_str)*
                }
            }

            fn to_i32(self) -> i32 {
                #to_i32
            }
        }

        impl ::std::convert::From<#ident> for i32 {
            fn from(value: #ident) -> i32 {
                ::protoquill::ProtoEnum::to_i32(value)
            }
        }

        #default_impl
    })
}

/// Negative numbers are emitted as a negated literal.
fn int_literal(value: i32) -> TokenStream {
    let magnitude = Literal::i64_unsuffixed((value as i64).abs());
    if value < 0 {
        quote!(-#magnitude)
    } else {
        quote!(#magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::reprint;
    use crate::config::Config;
    use crate::context::IdentifierTable;
    use crate::descriptor::builder::*;

    fn generate_size(values: &[(&str, i32)]) -> String {
        let size = EnumDescriptorProto::new("Size", values);
        let file = FileDescriptorProto::new("shop.proto", "shop").with_enum(size.clone());
        let table = IdentifierTable::new(&Config::new(), &FileDescriptorSet { file: vec![file] })
            .unwrap();
        let names = table.enumeration(".shop.Size").unwrap();
        let code = generate(
            ".shop.Size",
            &size,
            names,
            &CommentMap::default(),
            &DescriptorPath::top_level_enum(0),
        )
        .unwrap();
        reprint::<syn::File>(code)
    }

    #[test]
    fn test_aliases_only_parse() {
        let code = generate_size(&[("SIZE_UNSPECIFIED", 0), ("SIZE_BIG", 1), ("SIZE_LARGE", 1)]);
        let arm = |tokens| reprint::<syn::Arm>(tokens);

        assert!(code.contains(&arm(quote!("SIZE_LARGE" => ::std::option::Option::Some(Self::SizeBig),))));
        assert!(!code.contains(&arm(quote!(Self::SizeBig => "SIZE_LARGE",))));
        assert!(code.contains(&arm(quote!(Self::SizeBig => "SIZE_BIG",))));
        assert!(code.contains(&reprint::<syn::ImplItem>(quote!(
            const NAME: &'static str = "shop.Size";
        ))));
    }

    #[test]
    fn test_default_is_zero_value() {
        let default = |tokens| reprint::<syn::ImplItem>(tokens);

        let code = generate_size(&[("SIZE_BIG", 1), ("SIZE_UNSPECIFIED", 0)]);
        assert!(code.contains(&default(quote!(fn default() -> Self { Self::SizeUnspecified }))));

        let code = generate_size(&[("SIZE_BIG", 1), ("SIZE_SMALL", 2)]);
        assert!(code.contains(&default(quote!(fn default() -> Self { Self::SizeBig }))));
    }

    #[test]
    fn test_empty_enum_has_no_default() {
        let code = generate_size(&[]);
        assert!(!code.contains("Default for"));
    }
}
