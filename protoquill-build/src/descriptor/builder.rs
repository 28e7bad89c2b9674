//! Constructors for building descriptors in code.
//!
//! protoc is the usual source of descriptors, these helpers exist for build
//! scripts and tests that describe a schema without a `.proto` file. They fill
//! in the same derived data protoc does: `json_name`, the synthetic oneof of a
//! proto3 `optional` field and the entry message of a map field.
//!
//! ```
//! use protoquill_build::descriptor::builder::*;
//!
//! let hat = DescriptorProto::new("Hat")
//!     .with_field(FieldDescriptorProto::scalar("inches", 1, Type::Int32))
//!     .with_field(FieldDescriptorProto::scalar("color", 2, Type::String));
//! let file = FileDescriptorProto::new("shop.proto", "shop").with_message(hat);
//! assert_eq!(file.message_type[0].field[1].json_name.as_deref(), Some("color"));
//! ```

pub use super::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, Label, Location, MessageOptions,
    OneofDescriptorProto, SourceCodeInfo, Type,
};

use protoquill::json::lower_camel_case;

impl FileDescriptorProto {
    /// A proto3 file. An empty `package` leaves the package unset.
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        let package = package.into();
        FileDescriptorProto {
            name: Some(name.into()),
            package: (!package.is_empty()).then_some(package),
            syntax: Some("proto3".to_string()),
            ..Default::default()
        }
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependency.push(name.into());
        self
    }

    pub fn with_message(mut self, message: DescriptorProto) -> Self {
        self.message_type.push(message);
        self
    }

    pub fn with_enum(mut self, enum_type: EnumDescriptorProto) -> Self {
        self.enum_type.push(enum_type);
        self
    }
}

impl DescriptorProto {
    pub fn new(name: impl Into<String>) -> Self {
        DescriptorProto {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Adds a field. A proto3 `optional` field also gets its synthetic oneof.
    pub fn with_field(mut self, mut field: FieldDescriptorProto) -> Self {
        if field.is_proto3_optional() {
            let name = field.name.as_deref().unwrap_or_default();
            field.oneof_index = Some(self.oneof_decl.len() as i32);
            self.oneof_decl.push(OneofDescriptorProto {
                name: Some(format!("_{name}")),
            });
        }
        self.field.push(field);
        self
    }

    /// Adds a oneof whose members are `fields`.
    pub fn with_oneof(mut self, name: impl Into<String>, fields: Vec<FieldDescriptorProto>) -> Self {
        let index = self.oneof_decl.len() as i32;
        self.oneof_decl.push(OneofDescriptorProto {
            name: Some(name.into()),
        });
        for mut field in fields {
            field.oneof_index = Some(index);
            field.proto3_optional = None;
            self.field.push(field);
        }
        self
    }

    /// Adds a `map<key, value>` field and its entry message.
    ///
    /// The name and number of `value` are replaced with `value = 2`. `scope`
    /// is the fully-qualified name of this message, e.g. `.shop.Hat`, it is
    /// needed to reference the nested entry type.
    pub fn with_map_field(
        mut self,
        name: &str,
        number: i32,
        key: Type,
        value: FieldDescriptorProto,
        scope: &str,
    ) -> Self {
        let entry_name = format!("{}Entry", upper_camel_case(name));

        let value = FieldDescriptorProto {
            name: Some("value".to_string()),
            number: Some(2),
            json_name: Some("value".to_string()),
            label: Some(Label::Optional as i32),
            oneof_index: None,
            proto3_optional: None,
            ..value
        };
        let entry = DescriptorProto {
            name: Some(entry_name.clone()),
            field: vec![FieldDescriptorProto::scalar("key", 1, key), value],
            options: Some(MessageOptions {
                map_entry: Some(true),
            }),
            ..Default::default()
        };
        self.nested_type.push(entry);

        let field = FieldDescriptorProto::message(name, number, format!("{scope}.{entry_name}"));
        self.field.push(field.repeated());
        self
    }

    pub fn with_nested(mut self, message: DescriptorProto) -> Self {
        self.nested_type.push(message);
        self
    }

    pub fn with_enum(mut self, enum_type: EnumDescriptorProto) -> Self {
        self.enum_type.push(enum_type);
        self
    }
}

impl FieldDescriptorProto {
    /// A singular field of a scalar type.
    pub fn scalar(name: &str, number: i32, r#type: Type) -> Self {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(r#type as i32),
            json_name: Some(lower_camel_case(name)),
            ..Default::default()
        }
    }

    /// A singular field referencing the message `type_name`, e.g. `.shop.Hat`.
    pub fn message(name: &str, number: i32, type_name: impl Into<String>) -> Self {
        FieldDescriptorProto {
            type_name: Some(type_name.into()),
            ..FieldDescriptorProto::scalar(name, number, Type::Message)
        }
    }

    /// A singular field referencing the enum `type_name`.
    pub fn enumeration(name: &str, number: i32, type_name: impl Into<String>) -> Self {
        FieldDescriptorProto {
            type_name: Some(type_name.into()),
            ..FieldDescriptorProto::scalar(name, number, Type::Enum)
        }
    }

    pub fn repeated(mut self) -> Self {
        self.label = Some(Label::Repeated as i32);
        self
    }

    /// Marks the field as proto3 `optional`, giving it explicit presence.
    pub fn optional(mut self) -> Self {
        self.proto3_optional = Some(true);
        self
    }

    pub fn with_json_name(mut self, json_name: impl Into<String>) -> Self {
        self.json_name = Some(json_name.into());
        self
    }
}

impl EnumDescriptorProto {
    pub fn new(name: impl Into<String>, values: &[(&str, i32)]) -> Self {
        EnumDescriptorProto {
            name: Some(name.into()),
            value: values
                .iter()
                .map(|(name, number)| EnumValueDescriptorProto {
                    name: Some(name.to_string()),
                    number: Some(*number),
                })
                .collect(),
        }
    }
}

/// `labels_by_id` -> `LabelsById`, the way protoc names map entries.
fn upper_camel_case(name: &str) -> String {
    let camel = lower_camel_case(name);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_gets_synthetic_oneof() {
        let message = DescriptorProto::new("Hat")
            .with_oneof("size", vec![FieldDescriptorProto::scalar("small", 1, Type::Bool)])
            .with_field(FieldDescriptorProto::scalar("color", 2, Type::String).optional());

        assert_eq!(message.oneof_decl.len(), 2);
        assert_eq!(message.oneof_decl[1].name.as_deref(), Some("_color"));
        assert_eq!(message.field[1].oneof_index, Some(1));
        assert_eq!(message.field[0].oneof_index, Some(0));
    }

    #[test]
    fn test_map_field_entry() {
        let message = DescriptorProto::new("Hat").with_map_field(
            "labels_by_id",
            7,
            Type::Int32,
            FieldDescriptorProto::message("value", 2, ".shop.Label"),
            ".shop.Hat",
        );

        let entry = &message.nested_type[0];
        assert!(entry.is_map_entry());
        assert_eq!(entry.name.as_deref(), Some("LabelsByIdEntry"));
        assert_eq!(entry.field[0].field_type(), Some(Type::Int32));
        assert_eq!(entry.field[1].type_name.as_deref(), Some(".shop.Label"));

        let field = &message.field[0];
        assert!(field.is_repeated());
        assert_eq!(field.json_name.as_deref(), Some("labelsById"));
        assert_eq!(field.type_name.as_deref(), Some(".shop.Hat.LabelsByIdEntry"));
    }

    #[test]
    fn test_file_without_package() {
        let file = FileDescriptorProto::new("bare.proto", "");
        assert_eq!(file.package, None);
        assert_eq!(file.type_prefix(), ".");
        assert!(file.is_proto3());
    }
}
