//! Code generation from protobuf descriptors.

mod binary;
mod comments;
mod enumeration;
mod field;
mod json;
mod message;
mod module;
mod oneof;
mod recursion;

pub use oneof::collect_oneofs;
pub use recursion::{find_recursive_fields, RecursiveField};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use proc_macro2::TokenStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::{is_well_known, package_module, IdentifierTable, RustPath};
use crate::descriptor::{
    decode_file_descriptor_set, encode_file_descriptor_set, DescriptorProto, FileDescriptorProto,
    FileDescriptorSet, Label, Type,
};
use crate::protoc;
use crate::Error;

use comments::{CommentMap, DescriptorPath};

/// A generated Rust source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name relative to the output directory, e.g. `shop.rs`.
    pub name: String,
    pub content: String,
}

/// Main entry point for code generation.
pub fn compile(
    config: &Config,
    protos: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
) -> Result<(), Error> {
    let fds = if config.skip_protoc {
        let path = config
            .file_descriptor_set_path
            .as_ref()
            .ok_or(Error::MissingDescriptorPath)?;
        let bytes = std::fs::read(path)?;
        decode_file_descriptor_set(&bytes)?
    } else {
        let protoc_path = config
            .protoc_path
            .clone()
            .map(Ok)
            .unwrap_or_else(protoc::find_protoc)?;
        protoc::invoke_protoc(&protoc_path, protos, includes, &config.protoc_args)?
    };

    if let Some(path) = &config.file_descriptor_set_path {
        if !config.skip_protoc {
            std::fs::write(path, encode_file_descriptor_set(&fds))?;
        }
    }

    compile_fds(config, fds)
}

/// Compile from a FileDescriptorSet.
pub fn compile_fds(config: &Config, fds: FileDescriptorSet) -> Result<(), Error> {
    let out_dir: PathBuf = config
        .out_dir
        .clone()
        .or_else(|| std::env::var_os("OUT_DIR").map(Into::into))
        .ok_or(Error::MissingOutDir)?;

    let files = generate(config, &fds, None)?;
    module::write_files(&out_dir, &files)?;
    info!(
        files = files.len(),
        out_dir = %out_dir.display(),
        "wrote generated code"
    );

    Ok(())
}

/// Generates Rust code for the files of `fds`.
///
/// `targets` names the files to generate, all other files only provide types
/// for resolution. Every file is generated when it is `None`. Files of one
/// package are merged into a single module.
pub fn generate(
    config: &Config,
    fds: &FileDescriptorSet,
    targets: Option<&[String]>,
) -> Result<Vec<GeneratedFile>, Error> {
    let ctx = IdentifierTable::new(config, fds)?;
    let mut modules: BTreeMap<String, TokenStream> = BTreeMap::new();

    for file in &fds.file {
        let name = file.name.as_deref().ok_or(Error::MissingName)?;
        if let Some(targets) = targets {
            if !targets.iter().any(|target| target == name) {
                continue;
            }
        }
        if is_well_known(file) && !config.emit_well_known_types {
            warn!(file = name, "skipping well-known types file");
            continue;
        }

        validate_file(file)?;
        debug!(
            file = name,
            messages = file.message_type.len(),
            enums = file.enum_type.len(),
            "generating"
        );
        let code = generate_file(&ctx, file)?;
        // Files whose types all come from extern paths.
        if !code.is_empty() {
            modules.entry(package_module(file)).or_default().extend(code);
        }
    }

    module::render_modules(&modules, config.skip_format)
}

/// Generate code for a single .proto file.
fn generate_file(ctx: &IdentifierTable, file: &FileDescriptorProto) -> Result<TokenStream, Error> {
    let comments = CommentMap::from_file(file);
    let prefix = file.type_prefix();
    let module = vec![package_module(file)];
    let mut tokens = TokenStream::new();

    for (index, enum_type) in file.enum_type.iter().enumerate() {
        let name = enum_type.name.as_deref().ok_or(Error::MissingName)?;
        let fqn = format!("{prefix}{name}");
        let (Some(info), Some(names)) = (ctx.type_info(&fqn), ctx.enumeration(&fqn)) else {
            continue;
        };
        if matches!(info.path, RustPath::Generated { .. }) {
            tokens.extend(enumeration::generate(
                &fqn,
                enum_type,
                names,
                &comments,
                &DescriptorPath::top_level_enum(index),
            )?);
        }
    }

    for (index, message) in file.message_type.iter().enumerate() {
        let name = message.name.as_deref().ok_or(Error::MissingName)?;
        tokens.extend(message::generate(
            ctx,
            &format!("{prefix}{name}"),
            &module,
            message,
            &comments,
            &DescriptorPath::message(index),
        )?);
    }

    Ok(tokens)
}

/// Rejects the proto2 features the generator has no representation for.
fn validate_file(file: &FileDescriptorProto) -> Result<(), Error> {
    let name = file.name.clone().unwrap_or_default();
    if !file.is_proto3() {
        return Err(Error::Proto2Unsupported {
            file: name,
            reason: "proto2 syntax",
        });
    }
    for message in &file.message_type {
        validate_message(&name, message)?;
    }
    Ok(())
}

fn validate_message(file: &str, message: &DescriptorProto) -> Result<(), Error> {
    for field in &message.field {
        if field.label() == Label::Required {
            return Err(Error::Proto2Unsupported {
                file: file.to_string(),
                reason: "required fields",
            });
        }
        if field.default_value.is_some() {
            return Err(Error::Proto2Unsupported {
                file: file.to_string(),
                reason: "default values",
            });
        }
        if field.field_type() == Some(Type::Group) {
            return Err(Error::GroupsUnsupported(field.name.clone().unwrap_or_default()));
        }
    }
    for nested in &message.nested_type {
        validate_message(file, nested)?;
    }
    Ok(())
}

/// Parses `tokens` as `T`. Comparing syntax trees ignores token spacing, so
/// `>>` and `> >` are the same.
#[cfg(test)]
pub(crate) fn syntax<T: syn::parse::Parse>(tokens: TokenStream) -> T {
    syn::parse2(tokens).unwrap()
}

/// Statements wrapped in a block, for comparing generated field code.
#[cfg(test)]
pub(crate) fn block(tokens: TokenStream) -> syn::Block {
    syntax(quote::quote!({ #tokens }))
}

/// Tokens reprinted through `syn`, for substring checks on generated items.
#[cfg(test)]
pub(crate) fn reprint<T: syn::parse::Parse + quote::ToTokens>(tokens: TokenStream) -> String {
    quote::ToTokens::into_token_stream(syntax::<T>(tokens)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::*;

    fn shop() -> FileDescriptorProto {
        FileDescriptorProto::new("shop.proto", "shop").with_message(
            DescriptorProto::new("Hat")
                .with_field(FieldDescriptorProto::scalar("inches", 1, Type::Int32)),
        )
    }

    #[test]
    fn test_files_of_a_package_share_a_module() {
        let extra = FileDescriptorProto::new("shop_extra.proto", "shop")
            .with_message(DescriptorProto::new("Scarf"));
        let fds = FileDescriptorSet {
            file: vec![shop(), extra],
        };

        let files = generate(&Config::new(), &fds, None).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["shop.rs", "mod.rs"]);
        assert!(files[0].content.contains("pub struct Hat"));
        assert!(files[0].content.contains("pub struct Scarf"));
    }

    #[test]
    fn test_only_targets_are_generated() {
        let common = FileDescriptorProto::new("common.proto", "common")
            .with_message(DescriptorProto::new("Money"));
        let shop = shop()
            .with_dependency("common.proto")
            .with_message(
                DescriptorProto::new("Price")
                    .with_field(FieldDescriptorProto::message("amount", 1, ".common.Money")),
            );
        let fds = FileDescriptorSet {
            file: vec![common, shop],
        };

        let files = generate(&Config::new(), &fds, Some(&["shop.proto".to_string()])).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["shop.rs", "mod.rs"]);
        assert!(files[0].content.contains("super::common::Money"));
    }

    #[test]
    fn test_proto2_rejected() {
        let mut file = shop();
        file.syntax = Some("proto2".to_string());
        let fds = FileDescriptorSet { file: vec![file] };
        assert!(matches!(
            generate(&Config::new(), &fds, None),
            Err(Error::Proto2Unsupported { reason: "proto2 syntax", .. })
        ));
    }

    #[test]
    fn test_required_field_rejected() {
        let mut field = FieldDescriptorProto::scalar("inches", 1, Type::Int32);
        field.label = Some(Label::Required as i32);
        let file = FileDescriptorProto::new("shop.proto", "shop")
            .with_message(DescriptorProto::new("Hat").with_nested(DescriptorProto::new("Brim").with_field(field)));
        assert!(matches!(
            validate_file(&file),
            Err(Error::Proto2Unsupported { reason: "required fields", .. })
        ));
    }
}
