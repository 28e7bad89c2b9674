//! Configuration for protobuf code generation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::descriptor::FileDescriptorSet;
use crate::Error;

/// Configuration for protobuf code generation.
///
/// The same options are available to build scripts through the builder
/// methods and to `protoc-gen-quill` through [`Config::from_parameter`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Output directory for generated files, `OUT_DIR` when unset.
    pub(crate) out_dir: Option<PathBuf>,

    /// Path to the protoc executable.
    pub(crate) protoc_path: Option<PathBuf>,

    /// Additional arguments for protoc.
    pub(crate) protoc_args: Vec<String>,

    /// Skip running protoc, use pre-existing FileDescriptorSet.
    pub(crate) skip_protoc: bool,

    /// Path to read/write FileDescriptorSet.
    pub(crate) file_descriptor_set_path: Option<PathBuf>,

    /// Maps a fully-qualified proto name, or a package prefix of one, to a
    /// Rust path, e.g. `.shop.Money` -> `::money::Money`.
    pub(crate) extern_paths: BTreeMap<String, String>,

    /// Disable formatting with prettyplease.
    pub(crate) skip_format: bool,

    /// Generate code for files in the `google.protobuf` package.
    pub(crate) emit_well_known_types: bool,
}

impl Config {
    /// Create a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the comma separated `key[=value]` parameter string protoc
    /// passes to plugins, e.g. `target=rust,skip_format`.
    pub fn from_parameter(parameter: &str) -> Result<Self, Error> {
        let mut config = Config::new();

        for option in parameter.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            let (key, value) = match option.split_once('=') {
                Some((key, value)) => (key, Some(value)),
                None => (option, None),
            };

            match (key, value) {
                ("target", Some("rust")) => {}
                ("target", Some(other)) => return Err(Error::UnsupportedTarget(other.to_owned())),
                ("emit_well_known_types", None | Some("true")) => {
                    config.emit_well_known_types = true;
                }
                ("emit_well_known_types", Some("false")) => {
                    config.emit_well_known_types = false;
                }
                ("skip_format", None | Some("true")) => {
                    config.skip_format = true;
                }
                ("extern_path", Some(mapping)) => {
                    let (proto_path, rust_path) = mapping
                        .split_once('=')
                        .ok_or_else(|| Error::InvalidParameter(option.to_owned()))?;
                    config.extern_path(proto_path, rust_path);
                }
                _ => return Err(Error::InvalidParameter(option.to_owned())),
            }
        }

        Ok(config)
    }

    /// Set the output directory for generated Rust files.
    pub fn out_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.out_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set path to the protoc executable.
    pub fn protoc_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.protoc_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add an argument to pass to protoc.
    pub fn protoc_arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.protoc_args.push(arg.into());
        self
    }

    /// Skip running protoc; use an existing FileDescriptorSet instead.
    pub fn skip_protoc_run(&mut self) -> &mut Self {
        self.skip_protoc = true;
        self
    }

    /// Path to write/read the FileDescriptorSet.
    pub fn file_descriptor_set_path(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.file_descriptor_set_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Declare an externally provided protobuf type.
    ///
    /// When a field references a type matching `proto_path`, the generated code
    /// will use `rust_path` instead of generating the type. A package such as
    /// `.shop` maps every type below it, nested types are looked up in the
    /// snake_case module of their parent.
    ///
    /// # Example
    /// ```ignore
    /// config.extern_path(".shop.Money", "::money::Money");
    /// ```
    pub fn extern_path(
        &mut self,
        proto_path: impl Into<String>,
        rust_path: impl Into<String>,
    ) -> &mut Self {
        self.extern_paths.insert(proto_path.into(), rust_path.into());
        self
    }

    /// Skip formatting with prettyplease.
    pub fn skip_format(&mut self) -> &mut Self {
        self.skip_format = true;
        self
    }

    /// Also generate code for `google.protobuf` files, which are skipped by
    /// default. `Timestamp` and `Duration` always come from `protoquill::wkt`.
    pub fn emit_well_known_types(&mut self, emit: bool) -> &mut Self {
        self.emit_well_known_types = emit;
        self
    }

    /// Compile `.proto` files into Rust files.
    pub fn compile_protos(
        &self,
        protos: &[impl AsRef<Path>],
        includes: &[impl AsRef<Path>],
    ) -> Result<(), Error> {
        crate::codegen::compile(self, protos, includes)
    }

    /// Compile from an existing FileDescriptorSet.
    pub fn compile_fds(&self, fds: FileDescriptorSet) -> Result<(), Error> {
        crate::codegen::compile_fds(self, fds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parameter() {
        let config = Config::from_parameter(
            "target=rust, emit_well_known_types,skip_format,extern_path=.shop.Money=::money::Money",
        )
        .unwrap();

        assert!(config.emit_well_known_types);
        assert!(config.skip_format);
        assert_eq!(
            config.extern_paths.get(".shop.Money").map(String::as_str),
            Some("::money::Money")
        );
    }

    #[test]
    fn test_from_parameter_empty() {
        let config = Config::from_parameter("").unwrap();
        assert!(!config.emit_well_known_types);
        assert!(!config.skip_format);
        assert!(config.extern_paths.is_empty());
    }

    #[test]
    fn test_from_parameter_rejects_other_targets() {
        assert!(matches!(
            Config::from_parameter("target=python"),
            Err(Error::UnsupportedTarget(target)) if target == "python"
        ));
    }

    #[test]
    fn test_from_parameter_rejects_unknown_options() {
        #[track_caller]
        fn test_case(parameter: &str) {
            assert!(
                matches!(Config::from_parameter(parameter), Err(Error::InvalidParameter(_))),
                "accepted {parameter}"
            );
        }

        test_case("unknown");
        test_case("skip_format=maybe");
        test_case("extern_path=.shop.Money");
        test_case("target");
    }
}
