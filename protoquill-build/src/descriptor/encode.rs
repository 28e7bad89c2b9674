//! Encoder for FileDescriptorSet into protobuf binary format.
//!
//! Only the fields modelled in [`super`] are written, so decoding and
//! re-encoding a descriptor produced by protoc drops options and other
//! unmodelled data.

use protoquill::Writer;

use super::*;

/// Encode a FileDescriptorSet, e.g. to save it next to the generated code.
pub fn encode_file_descriptor_set(fds: &FileDescriptorSet) -> Vec<u8> {
    let mut writer = Writer::new();
    for file in &fds.file {
        writer.write_nested(1, |nested| encode_file_descriptor_proto(file, nested));
    }
    writer.finish()
}

pub(crate) fn encode_file_descriptor_proto(file: &FileDescriptorProto, writer: &mut Writer) {
    if let Some(name) = &file.name {
        writer.write_string(1, name);
    }
    if let Some(package) = &file.package {
        writer.write_string(2, package);
    }
    for dependency in &file.dependency {
        writer.write_string(3, dependency);
    }
    for message in &file.message_type {
        writer.write_nested(4, |nested| encode_descriptor_proto(message, nested));
    }
    for enum_type in &file.enum_type {
        writer.write_nested(5, |nested| encode_enum_descriptor_proto(enum_type, nested));
    }
    if let Some(info) = &file.source_code_info {
        writer.write_nested(9, |nested| {
            for location in &info.location {
                nested.write_nested(1, |nested| encode_location(location, nested));
            }
        });
    }
    if let Some(syntax) = &file.syntax {
        writer.write_string(12, syntax);
    }
}

fn encode_descriptor_proto(message: &DescriptorProto, writer: &mut Writer) {
    if let Some(name) = &message.name {
        writer.write_string(1, name);
    }
    for field in &message.field {
        writer.write_nested(2, |nested| encode_field_descriptor_proto(field, nested));
    }
    for nested_type in &message.nested_type {
        writer.write_nested(3, |nested| encode_descriptor_proto(nested_type, nested));
    }
    for enum_type in &message.enum_type {
        writer.write_nested(4, |nested| encode_enum_descriptor_proto(enum_type, nested));
    }
    if let Some(options) = &message.options {
        writer.write_nested(7, |nested| {
            if let Some(map_entry) = options.map_entry {
                nested.write_bool(7, map_entry);
            }
        });
    }
    for oneof in &message.oneof_decl {
        writer.write_nested(8, |nested| {
            if let Some(name) = &oneof.name {
                nested.write_string(1, name);
            }
        });
    }
}

fn encode_field_descriptor_proto(field: &FieldDescriptorProto, writer: &mut Writer) {
    if let Some(name) = &field.name {
        writer.write_string(1, name);
    }
    if let Some(number) = field.number {
        writer.write_int32(3, number);
    }
    if let Some(label) = field.label {
        writer.write_int32(4, label);
    }
    if let Some(r#type) = field.r#type {
        writer.write_int32(5, r#type);
    }
    if let Some(type_name) = &field.type_name {
        writer.write_string(6, type_name);
    }
    if let Some(default_value) = &field.default_value {
        writer.write_string(7, default_value);
    }
    if let Some(oneof_index) = field.oneof_index {
        writer.write_int32(9, oneof_index);
    }
    if let Some(json_name) = &field.json_name {
        writer.write_string(10, json_name);
    }
    if let Some(proto3_optional) = field.proto3_optional {
        writer.write_bool(17, proto3_optional);
    }
}

fn encode_enum_descriptor_proto(enum_type: &EnumDescriptorProto, writer: &mut Writer) {
    if let Some(name) = &enum_type.name {
        writer.write_string(1, name);
    }
    for value in &enum_type.value {
        writer.write_nested(2, |nested| {
            if let Some(name) = &value.name {
                nested.write_string(1, name);
            }
            if let Some(number) = value.number {
                nested.write_int32(2, number);
            }
        });
    }
}

fn encode_location(location: &Location, writer: &mut Writer) {
    if !location.path.is_empty() {
        writer.write_packed_int32(1, &location.path);
    }
    if !location.span.is_empty() {
        writer.write_packed_int32(2, &location.span);
    }
    if let Some(leading) = &location.leading_comments {
        writer.write_string(3, leading);
    }
    if let Some(trailing) = &location.trailing_comments {
        writer.write_string(4, trailing);
    }
    for detached in &location.leading_detached_comments {
        writer.write_string(6, detached);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::descriptor::builder::*;
    use crate::descriptor::decode_file_descriptor_set;

    #[test]
    fn test_encode_then_decode() {
        let hat = DescriptorProto::new("Hat")
            .with_field(FieldDescriptorProto::scalar("inches", 1, Type::Int32))
            .with_field(FieldDescriptorProto::scalar("color", 2, Type::String).optional())
            .with_map_field(
                "labels",
                3,
                Type::String,
                FieldDescriptorProto::scalar("value", 2, Type::Int64),
                ".shop.Hat",
            )
            .with_oneof(
                "size",
                vec![
                    FieldDescriptorProto::scalar("small", 4, Type::Bool),
                    FieldDescriptorProto::enumeration("large", 5, ".shop.Size"),
                ],
            );
        let mut file = FileDescriptorProto::new("shop.proto", "shop")
            .with_message(hat)
            .with_enum(EnumDescriptorProto::new(
                "Size",
                &[("SIZE_UNSPECIFIED", 0), ("SIZE_BIG", 1)],
            ));
        file.source_code_info = Some(SourceCodeInfo {
            location: vec![Location {
                path: vec![4, 0],
                span: vec![3, 0, 10, 1],
                leading_comments: Some(" A hat.\n".into()),
                trailing_comments: None,
                leading_detached_comments: vec![" detached\n".into()],
            }],
        });

        let fds = FileDescriptorSet { file: vec![file] };
        let bytes = encode_file_descriptor_set(&fds);
        assert_eq!(decode_file_descriptor_set(&bytes).unwrap(), fds);
    }

    #[test]
    fn test_encode_empty() {
        assert!(encode_file_descriptor_set(&FileDescriptorSet::default()).is_empty());
    }
}
