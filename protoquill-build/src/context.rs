//! Identifier resolution for generated code.
//!
//! The [`IdentifierTable`] is built once per invocation from the whole
//! FileDescriptorSet. It assigns every Rust identifier the generator emits
//! (types, partials, modules, fields, oneofs and variants) up front, so that
//! per-message generation only ever reads it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use tracing::trace;

use crate::codegen::{collect_oneofs, find_recursive_fields, RecursiveField};
use crate::config::Config;
use crate::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet, Type,
};
use crate::Error;

/// Package of the well-known types.
pub const WELL_KNOWN_PACKAGE: &str = "google.protobuf";

/// Well-known types with a hand written runtime representation.
const RUNTIME_TYPES: &[(&str, &str)] = &[
    (".google.protobuf.Timestamp", "::protoquill::wkt::Timestamp"),
    (".google.protobuf.Duration", "::protoquill::wkt::Duration"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Message,
    Enum,
    MapEntry,
}

/// Where the Rust definition of a proto type lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RustPath {
    /// Emitted by this invocation. `module` is relative to the generated
    /// `mod.rs`.
    Generated { module: Vec<String>, ident: String },
    /// Provided by another crate, either the runtime or an `extern_path`.
    External(String),
    /// Defined in a well-known file that is not generated.
    Suppressed,
}

/// Information about a type in the registry.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// The file this type is defined in.
    pub file: String,
    pub kind: TypeKind,
    pub path: RustPath,
}

/// Identifiers assigned to a message.
#[derive(Debug, Clone, Default)]
pub struct MessageNames {
    pub ident: String,
    pub partial: String,
    /// Module holding the nested types and the oneof enums.
    pub module: String,
    /// Struct field identifiers of the non-oneof fields, by field number.
    pub fields: BTreeMap<i32, String>,
    /// By index into `oneof_decl`, synthetic oneofs are not listed.
    pub oneofs: BTreeMap<usize, OneofNames>,
}

#[derive(Debug, Clone, Default)]
pub struct OneofNames {
    /// Struct field holding the oneof.
    pub field: String,
    /// Enum in the message's module.
    pub ident: String,
    /// Enum variants, by field number.
    pub variants: BTreeMap<i32, String>,
}

/// Identifiers assigned to an enum.
#[derive(Debug, Clone, Default)]
pub struct EnumNames {
    pub ident: String,
    /// One entry per value, in declaration order.
    pub values: Vec<EnumValueNames>,
}

#[derive(Debug, Clone)]
pub struct EnumValueNames {
    pub ident: String,
    /// False for an alias, which shares the variant of the first value with
    /// its number.
    pub canonical: bool,
}

/// Information about a map entry message type.
#[derive(Debug, Clone)]
pub struct MapEntryInfo {
    pub key: FieldDescriptorProto,
    pub value: FieldDescriptorProto,
}

/// Registry of every type in a FileDescriptorSet and the identifiers
/// generated for it.
#[derive(Debug, Default)]
pub struct IdentifierTable {
    types: HashMap<String, TypeInfo>,
    messages: HashMap<String, MessageNames>,
    enums: HashMap<String, EnumNames>,
    map_entries: HashMap<String, MapEntryInfo>,
    /// Fields that need to be boxed due to recursive type cycles.
    recursive_fields: HashSet<RecursiveField>,
}

/// Per-file state while registering types.
struct FileScope<'a> {
    config: &'a Config,
    file: String,
    suppressed: bool,
}

/// A Rust namespace in which identifiers must be unique.
#[derive(Debug, Default)]
struct Scope {
    taken: HashSet<String>,
}

impl Scope {
    /// Claims `ident`, appending `_` until it no longer collides.
    fn claim(&mut self, ident: String) -> String {
        let mut ident = ident;
        while self.taken.contains(unraw(&ident)) {
            ident = format!("{}_", unraw(&ident));
        }
        self.taken.insert(unraw(&ident).to_string());
        ident
    }
}

impl IdentifierTable {
    pub fn new(config: &Config, fds: &FileDescriptorSet) -> Result<Self, Error> {
        for (proto_path, rust_path) in &config.extern_paths {
            if !proto_path.starts_with('.') || syn::parse_str::<syn::Path>(rust_path).is_err() {
                return Err(Error::InvalidExternPath {
                    proto_path: proto_path.clone(),
                    rust_path: rust_path.clone(),
                });
            }
        }

        let mut table = IdentifierTable::default();
        // Files of one package share a module.
        let mut packages: HashMap<String, Scope> = HashMap::new();

        for file in &fds.file {
            let name = file.name.clone().ok_or(Error::MissingName)?;
            let scope = FileScope {
                config,
                suppressed: is_well_known(file) && !config.emit_well_known_types,
                file: name,
            };
            let module = vec![package_module(file)];
            let package_scope = packages.entry(module[0].clone()).or_default();
            table.register_scope(
                &scope,
                package_scope,
                &module,
                &file.type_prefix(),
                &file.message_type,
                &file.enum_type,
            )?;
        }

        table.recursive_fields = find_recursive_fields(fds);
        Ok(table)
    }

    /// Registers the messages and enums declared directly in one module.
    fn register_scope(
        &mut self,
        file: &FileScope<'_>,
        scope: &mut Scope,
        module: &[String],
        prefix: &str,
        messages: &[DescriptorProto],
        enums: &[EnumDescriptorProto],
    ) -> Result<(), Error> {
        // Map entries are never emitted and get no identifiers.
        let emitted: Vec<&DescriptorProto> = messages.iter().filter(|m| !m.is_map_entry()).collect();

        let mut message_idents = Vec::with_capacity(emitted.len());
        for message in &emitted {
            let name = message.name.as_deref().ok_or(Error::MissingName)?;
            message_idents.push(scope.claim(type_ident(name)));
        }
        let mut enum_idents = Vec::with_capacity(enums.len());
        for enum_type in enums {
            let name = enum_type.name.as_deref().ok_or(Error::MissingName)?;
            enum_idents.push(scope.claim(type_ident(name)));
        }
        let partials: Vec<String> = message_idents
            .iter()
            .map(|ident| scope.claim(format!("{}Partial", unraw(ident))))
            .collect();
        let mut modules = Vec::with_capacity(emitted.len());
        for message in &emitted {
            let name = message.name.as_deref().ok_or(Error::MissingName)?;
            modules.push(scope.claim(module_ident(name)));
        }

        for message in messages.iter().filter(|m| m.is_map_entry()) {
            self.register_map_entry(file, prefix, message)?;
        }

        for (enum_type, ident) in enums.iter().zip(enum_idents) {
            let name = enum_type.name.as_deref().ok_or(Error::MissingName)?;
            let fqn = format!("{prefix}{name}");
            let path = resolve_path(file, &fqn, module, &ident);
            self.types.insert(
                fqn.clone(),
                TypeInfo {
                    file: file.file.clone(),
                    kind: TypeKind::Enum,
                    path,
                },
            );
            self.enums.insert(fqn, enum_names(ident, enum_type)?);
        }

        for (index, message) in emitted.into_iter().enumerate() {
            let name = message.name.as_deref().ok_or(Error::MissingName)?;
            let fqn = format!("{prefix}{name}");
            let ident = &message_idents[index];
            let path = resolve_path(file, &fqn, module, ident);
            self.types.insert(
                fqn.clone(),
                TypeInfo {
                    file: file.file.clone(),
                    kind: TypeKind::Message,
                    path,
                },
            );

            let mut nested_module = module.to_vec();
            nested_module.push(modules[index].clone());
            let mut nested_scope = Scope::default();
            self.register_scope(
                file,
                &mut nested_scope,
                &nested_module,
                &format!("{fqn}."),
                &message.nested_type,
                &message.enum_type,
            )?;

            let names = message_names(
                message,
                ident.clone(),
                partials[index].clone(),
                modules[index].clone(),
                &mut nested_scope,
            )?;
            self.messages.insert(fqn, names);
        }

        Ok(())
    }

    fn register_map_entry(
        &mut self,
        file: &FileScope<'_>,
        prefix: &str,
        message: &DescriptorProto,
    ) -> Result<(), Error> {
        let name = message.name.as_deref().ok_or(Error::MissingName)?;
        let fqn = format!("{prefix}{name}");

        let key = message.field.iter().find(|f| f.number == Some(1));
        let value = message.field.iter().find(|f| f.number == Some(2));
        let (Some(key), Some(value)) = (key, value) else {
            return Err(Error::InvalidMapEntry(fqn));
        };
        let valid_key = matches!(
            key.field_type(),
            Some(
                Type::Int32
                    | Type::Int64
                    | Type::Uint32
                    | Type::Uint64
                    | Type::Sint32
                    | Type::Sint64
                    | Type::Fixed32
                    | Type::Fixed64
                    | Type::Sfixed32
                    | Type::Sfixed64
                    | Type::Bool
                    | Type::String
            )
        );
        if !valid_key || message.field.len() != 2 {
            return Err(Error::InvalidMapEntry(fqn));
        }

        self.types.insert(
            fqn.clone(),
            TypeInfo {
                file: file.file.clone(),
                kind: TypeKind::MapEntry,
                path: RustPath::Suppressed,
            },
        );
        self.map_entries.insert(
            fqn,
            MapEntryInfo {
                key: key.clone(),
                value: value.clone(),
            },
        );
        Ok(())
    }

    pub fn type_info(&self, fqn: &str) -> Option<&TypeInfo> {
        self.types.get(fqn)
    }

    pub fn message(&self, fqn: &str) -> Option<&MessageNames> {
        self.messages.get(fqn)
    }

    pub fn enumeration(&self, fqn: &str) -> Option<&EnumNames> {
        self.enums.get(fqn)
    }

    /// Get map entry info if the type is a map entry.
    pub fn map_entry(&self, fqn: &str) -> Option<&MapEntryInfo> {
        self.map_entries.get(fqn)
    }

    /// Check if a field needs to be boxed due to recursive type cycles.
    pub fn is_recursive_field(&self, message_fqn: &str, field_name: &str) -> bool {
        self.recursive_fields.contains(&RecursiveField {
            message_fqn: message_fqn.to_string(),
            field_name: field_name.to_string(),
        })
    }

    /// Looks up the type `type_name` referenced by `field`, failing if it is
    /// unknown, not of the `expected` kind or not generated.
    pub fn lookup(&self, field: &str, type_name: &str, expected: TypeKind) -> Result<&TypeInfo, Error> {
        let unresolved = || Error::UnresolvedType {
            field: field.to_string(),
            type_name: type_name.to_string(),
        };
        let info = self.types.get(type_name).ok_or_else(unresolved)?;
        if info.kind != expected {
            return Err(unresolved());
        }
        if info.path == RustPath::Suppressed {
            return Err(Error::UnsupportedWellKnownType(
                type_name.trim_start_matches('.').to_string(),
            ));
        }
        trace!(field, type_name, file = %info.file, "resolved type");
        Ok(info)
    }

    /// Path of the Rust type for `type_name`, relative to the module `from`.
    pub fn resolve(
        &self,
        from: &[String],
        field: &str,
        type_name: &str,
        expected: TypeKind,
    ) -> Result<TokenStream, Error> {
        match &self.lookup(field, type_name, expected)?.path {
            RustPath::Generated { module, ident } => Ok(relative_path(from, module, ident)),
            RustPath::External(path) => extern_tokens(type_name, path),
            RustPath::Suppressed => unreachable!("rejected by lookup"),
        }
    }

    /// Path of the partial type of the message `type_name`.
    pub fn resolve_partial(
        &self,
        from: &[String],
        field: &str,
        type_name: &str,
    ) -> Result<TokenStream, Error> {
        match &self.lookup(field, type_name, TypeKind::Message)?.path {
            RustPath::Generated { module, .. } => {
                let partial = self
                    .messages
                    .get(type_name)
                    .map(|names| names.partial.as_str())
                    .ok_or_else(|| Error::UnresolvedType {
                        field: field.to_string(),
                        type_name: type_name.to_string(),
                    })?;
                Ok(relative_path(from, module, partial))
            }
            RustPath::External(path) => {
                let path = extern_tokens(type_name, path)?;
                Ok(quote!(<#path as ::protoquill::Message>::Partial))
            }
            RustPath::Suppressed => unreachable!("rejected by lookup"),
        }
    }
}

fn extern_tokens(proto_path: &str, rust_path: &str) -> Result<TokenStream, Error> {
    let path: syn::Path = syn::parse_str(rust_path).map_err(|_| Error::InvalidExternPath {
        proto_path: proto_path.to_string(),
        rust_path: rust_path.to_string(),
    })?;
    Ok(quote!(#path))
}

/// Decides where the type `fqn`, declared as `ident` in `module`, comes from.
fn resolve_path(file: &FileScope<'_>, fqn: &str, module: &[String], ident: &str) -> RustPath {
    if let Some((_, path)) = RUNTIME_TYPES.iter().find(|(name, _)| *name == fqn) {
        return RustPath::External(path.to_string());
    }
    if let Some(path) = extern_path(&file.config.extern_paths, fqn) {
        return RustPath::External(path);
    }
    if file.suppressed {
        return RustPath::Suppressed;
    }
    RustPath::Generated {
        module: module.to_vec(),
        ident: ident.to_string(),
    }
}

/// Matches `fqn` against the configured extern paths, exactly or by its
/// longest package prefix.
fn extern_path(extern_paths: &BTreeMap<String, String>, fqn: &str) -> Option<String> {
    if let Some(path) = extern_paths.get(fqn) {
        return Some(path.clone());
    }

    let mut prefix = fqn;
    while let Some(index) = prefix.rfind('.') {
        prefix = &prefix[..index];
        if prefix.is_empty() {
            break;
        }
        if let Some(rust_path) = extern_paths.get(prefix) {
            let rest: Vec<&str> = fqn[prefix.len() + 1..].split('.').collect();
            let (ident, parents) = rest.split_last()?;
            let mut path = rust_path.clone();
            for parent in parents {
                path.push_str("::");
                path.push_str(&module_ident(parent));
            }
            path.push_str("::");
            path.push_str(&type_ident(ident));
            return Some(path);
        }
    }
    None
}

fn message_names(
    message: &DescriptorProto,
    ident: String,
    partial: String,
    module: String,
    nested_scope: &mut Scope,
) -> Result<MessageNames, Error> {
    let oneofs = collect_oneofs(message);

    let mut struct_scope = Scope::default();
    let mut fields = BTreeMap::new();
    for field in message.field.iter().filter(|f| !is_oneof_member(f)) {
        let name = field.name.as_deref().ok_or(Error::MissingName)?;
        let number = field
            .number
            .ok_or_else(|| Error::MissingFieldNumber(name.to_string()))?;
        if fields.insert(number, struct_scope.claim(field_ident(name))).is_some() {
            return Err(Error::DuplicateFieldNumber {
                message: message.name.clone().unwrap_or_default(),
                number,
            });
        }
    }

    let mut oneof_names = BTreeMap::new();
    for oneof in &oneofs {
        let name = oneof.oneof.name.as_deref().ok_or(Error::MissingName)?;
        let mut variant_scope = Scope::default();
        let mut variants = BTreeMap::new();
        for field in &oneof.fields {
            let field_name = field.name.as_deref().ok_or(Error::MissingName)?;
            let number = field
                .number
                .ok_or_else(|| Error::MissingFieldNumber(field_name.to_string()))?;
            let duplicate = fields.contains_key(&number)
                || variants
                    .insert(number, variant_scope.claim(type_ident(&to_pascal_case(field_name))))
                    .is_some();
            if duplicate {
                return Err(Error::DuplicateFieldNumber {
                    message: message.name.clone().unwrap_or_default(),
                    number,
                });
            }
        }
        oneof_names.insert(
            oneof.index,
            OneofNames {
                field: struct_scope.claim(field_ident(name)),
                ident: nested_scope.claim(type_ident(&to_pascal_case(name))),
                variants,
            },
        );
    }

    // Numbers shared between two different oneofs.
    let mut seen = HashSet::new();
    for number in oneof_names.values().flat_map(|o| o.variants.keys()) {
        if !seen.insert(*number) {
            return Err(Error::DuplicateFieldNumber {
                message: message.name.clone().unwrap_or_default(),
                number: *number,
            });
        }
    }

    Ok(MessageNames {
        ident,
        partial,
        module,
        fields,
        oneofs: oneof_names,
    })
}

/// Whether `field` is a member of a real oneof, proto3 `optional` fields are
/// not.
pub fn is_oneof_member(field: &FieldDescriptorProto) -> bool {
    field.oneof_index.is_some() && !field.is_proto3_optional()
}

fn enum_names(ident: String, enum_type: &EnumDescriptorProto) -> Result<EnumNames, Error> {
    let mut scope = Scope::default();
    let mut canonical: HashMap<i32, String> = HashMap::new();
    let mut values = Vec::with_capacity(enum_type.value.len());

    for value in &enum_type.value {
        let name = value.name.as_deref().ok_or(Error::MissingName)?;
        let number = value
            .number
            .ok_or_else(|| Error::MissingFieldNumber(name.to_string()))?;
        match canonical.get(&number) {
            Some(ident) => values.push(EnumValueNames {
                ident: ident.clone(),
                canonical: false,
            }),
            None => {
                let ident = scope.claim(type_ident(&to_enum_variant(name)));
                canonical.insert(number, ident.clone());
                values.push(EnumValueNames {
                    ident,
                    canonical: true,
                });
            }
        }
    }

    Ok(EnumNames { ident, values })
}

pub fn is_well_known(file: &FileDescriptorProto) -> bool {
    file.package() == WELL_KNOWN_PACKAGE
}

/// Name of the module generated for a file: its package with dots replaced,
/// or the file stem when there is no package.
pub fn package_module(file: &FileDescriptorProto) -> String {
    let name = match file.package() {
        "" => {
            let name = file.name.as_deref().unwrap_or("unknown");
            Path::new(name)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string()
        }
        package => package.to_string(),
    };

    let mut module: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if module.starts_with(|c: char| c.is_ascii_digit()) {
        module.insert(0, '_');
    }
    if is_rust_keyword(&module) {
        module.push('_');
    }
    module
}

/// Path from the module `from` to `ident` in the module `to`, both relative
/// to the generated `mod.rs`.
pub fn relative_path(from: &[String], to: &[String], ident: &str) -> TokenStream {
    let common = from
        .iter()
        .zip(to)
        .take_while(|(a, b)| a == b)
        .count();

    let supers = (common..from.len()).map(|_| quote!(super));
    let modules = to[common..].iter().map(|m| format_ident!("{}", m));
    let ident = format_ident!("{}", ident);
    quote!(#(#supers::)* #(#modules::)* #ident)
}

/// Convert proto name to valid Rust type identifier.
pub fn type_ident(name: &str) -> String {
    let mut ident = name.to_string();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if is_rust_keyword(&ident) {
        ident.push('_');
    }
    ident
}

/// Module for the nested types of the message `name`.
pub fn module_ident(name: &str) -> String {
    let mut snake = to_snake_case(name);
    if is_rust_keyword(&snake) {
        snake.push('_');
    }
    snake
}

/// Convert proto field name to Rust field name (snake_case).
pub fn field_ident(name: &str) -> String {
    let snake = to_snake_case(name);
    match snake.as_str() {
        // Cannot be raw identifiers.
        "self" | "Self" | "super" | "crate" => format!("{snake}_"),
        _ if is_rust_keyword(&snake) => format!("r#{snake}"),
        _ => snake,
    }
}

fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// Convert a string to snake_case.
///
/// Handles consecutive uppercase letters correctly:
/// - "HTTPServer" -> "http_server"
/// - "myField" -> "my_field"
/// - "XMLParser" -> "xml_parser"
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            // Add underscore if:
            // 1. Not at start AND previous char was lowercase, OR
            // 2. Not at start AND previous was uppercase AND next is lowercase
            //    (handles "HTTPServer" -> "http_server")
            if i > 0 {
                let prev_lower = chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit();
                let prev_upper = chars[i - 1].is_uppercase();
                let next_lower = chars.get(i + 1).map(|c| c.is_lowercase()).unwrap_or(false);
                if prev_lower || (prev_upper && next_lower) {
                    result.push('_');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert snake_case to PascalCase, keeping the case of the remaining
/// letters.
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}

/// Convert SCREAMING_SNAKE_CASE to PascalCase.
fn to_enum_variant(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.map(|c| c.to_ascii_lowercase()))
                    .collect(),
            }
        })
        .collect()
}

/// Check if a string is a Rust keyword.
fn is_rust_keyword(s: &str) -> bool {
    matches!(
        s,
        "as" | "break"
            | "const"
            | "continue"
            | "crate"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "self"
            | "Self"
            | "static"
            | "struct"
            | "super"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
            | "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
            | "gen"
    )
}
