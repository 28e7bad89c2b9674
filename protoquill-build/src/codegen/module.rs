//! Rendering and writing of generated modules.

use std::collections::BTreeMap;
use std::path::Path;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::Error;

use super::GeneratedFile;

const HEADER: &str = "// This file is @generated by protoquill-build.\n";

/// Renders one file per module plus a `mod.rs` declaring them all.
///
/// Generated code is always parsed back with syn, which catches codegen bugs
/// before rustc sees the file.
pub fn render_modules(
    modules: &BTreeMap<String, TokenStream>,
    skip_format: bool,
) -> Result<Vec<GeneratedFile>, Error> {
    let mut files = Vec::with_capacity(modules.len() + 1);

    for (name, tokens) in modules {
        files.push(GeneratedFile {
            name: format!("{name}.rs"),
            content: render(tokens.clone(), skip_format)?,
        });
    }

    let declarations = modules.keys().map(|name| {
        let ident = format_ident!("{}", name);
        let file = format!("{name}.rs");
        quote! {
            #[allow(
                clippy::all,
                dead_code,
                non_camel_case_types,
                non_snake_case,
                unused_variables
            )]
            pub mod #ident {
                include!(#file);
            }
        }
    });
    files.push(GeneratedFile {
        name: "mod.rs".to_string(),
        content: render(quote!(#(#declarations)*), skip_format)?,
    });

    Ok(files)
}

fn render(tokens: TokenStream, skip_format: bool) -> Result<String, Error> {
    let file: syn::File =
        syn::parse2(tokens.clone()).map_err(|e| Error::SynParse(e.to_string()))?;
    let body = if skip_format {
        tokens.to_string()
    } else {
        prettyplease::unparse(&file)
    };
    Ok(format!("{HEADER}\n{body}"))
}

/// Writes `files` into `out_dir`, replacing existing files.
pub fn write_files(out_dir: &Path, files: &[GeneratedFile]) -> Result<(), Error> {
    std::fs::create_dir_all(out_dir)?;
    for file in files {
        std::fs::write(out_dir.join(&file.name), &file.content)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_rs_includes_every_module() {
        let mut modules = BTreeMap::new();
        modules.insert("shop".to_string(), quote!(pub struct Hat;));
        modules.insert("common".to_string(), quote!(pub struct Money;));

        let files = render_modules(&modules, false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["common.rs", "shop.rs", "mod.rs"]);

        let mod_rs = &files[2].content;
        assert!(mod_rs.starts_with(HEADER));
        assert!(mod_rs.contains("pub mod common {"));
        assert!(mod_rs.contains("include!(\"shop.rs\");"));
        assert!(files[1].content.contains("pub struct Hat;"));
    }

    #[test]
    fn test_invalid_code_is_rejected() {
        let mut modules = BTreeMap::new();
        modules.insert("shop".to_string(), quote!(pub struct { }));

        assert!(matches!(
            render_modules(&modules, true),
            Err(Error::SynParse(_))
        ));
    }
}
