//! Decoder for FileDescriptorSet from protobuf binary format.

use protoquill::{DecodeError, Reader};

use super::*;
use crate::Error;

/// Decode a FileDescriptorSet from protobuf binary data.
pub fn decode_file_descriptor_set(data: &[u8]) -> Result<FileDescriptorSet, Error> {
    let mut reader = Reader::new(data);
    let mut fds = FileDescriptorSet::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => fds.file.push(reader.read_nested(decode_file_descriptor_proto)?),
            _ => reader.skip_field()?,
        }
    }

    Ok(fds)
}

/// Decode a FileDescriptorProto.
pub(crate) fn decode_file_descriptor_proto(
    reader: &mut Reader<'_>,
) -> Result<FileDescriptorProto, DecodeError> {
    let mut fdp = FileDescriptorProto::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => fdp.name = Some(reader.read_string()?),
            2 => fdp.package = Some(reader.read_string()?),
            3 => fdp.dependency.push(reader.read_string()?),
            4 => fdp
                .message_type
                .push(reader.read_nested(decode_descriptor_proto)?),
            5 => fdp
                .enum_type
                .push(reader.read_nested(decode_enum_descriptor_proto)?),
            9 => fdp.source_code_info = Some(reader.read_nested(decode_source_code_info)?),
            12 => fdp.syntax = Some(reader.read_string()?),
            _ => reader.skip_field()?,
        }
    }

    Ok(fdp)
}

/// Decode a DescriptorProto (message type).
fn decode_descriptor_proto(reader: &mut Reader<'_>) -> Result<DescriptorProto, DecodeError> {
    let mut dp = DescriptorProto::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => dp.name = Some(reader.read_string()?),
            2 => dp
                .field
                .push(reader.read_nested(decode_field_descriptor_proto)?),
            3 => dp
                .nested_type
                .push(reader.read_nested(decode_descriptor_proto)?),
            4 => dp
                .enum_type
                .push(reader.read_nested(decode_enum_descriptor_proto)?),
            7 => dp.options = Some(reader.read_nested(decode_message_options)?),
            8 => dp
                .oneof_decl
                .push(reader.read_nested(decode_oneof_descriptor_proto)?),
            _ => reader.skip_field()?,
        }
    }

    Ok(dp)
}

/// Decode a FieldDescriptorProto.
fn decode_field_descriptor_proto(
    reader: &mut Reader<'_>,
) -> Result<FieldDescriptorProto, DecodeError> {
    let mut fdp = FieldDescriptorProto::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => fdp.name = Some(reader.read_string()?),
            3 => fdp.number = Some(reader.read_int32()?),
            4 => fdp.label = Some(reader.read_int32()?),
            5 => fdp.r#type = Some(reader.read_int32()?),
            6 => fdp.type_name = Some(reader.read_string()?),
            7 => fdp.default_value = Some(reader.read_string()?),
            9 => fdp.oneof_index = Some(reader.read_int32()?),
            10 => fdp.json_name = Some(reader.read_string()?),
            17 => fdp.proto3_optional = Some(reader.read_bool()?),
            _ => reader.skip_field()?,
        }
    }

    Ok(fdp)
}

fn decode_enum_descriptor_proto(
    reader: &mut Reader<'_>,
) -> Result<EnumDescriptorProto, DecodeError> {
    let mut edp = EnumDescriptorProto::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => edp.name = Some(reader.read_string()?),
            2 => edp
                .value
                .push(reader.read_nested(decode_enum_value_descriptor_proto)?),
            _ => reader.skip_field()?,
        }
    }

    Ok(edp)
}

fn decode_enum_value_descriptor_proto(
    reader: &mut Reader<'_>,
) -> Result<EnumValueDescriptorProto, DecodeError> {
    let mut evdp = EnumValueDescriptorProto::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => evdp.name = Some(reader.read_string()?),
            2 => evdp.number = Some(reader.read_int32()?),
            _ => reader.skip_field()?,
        }
    }

    Ok(evdp)
}

fn decode_oneof_descriptor_proto(
    reader: &mut Reader<'_>,
) -> Result<OneofDescriptorProto, DecodeError> {
    let mut odp = OneofDescriptorProto::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => odp.name = Some(reader.read_string()?),
            _ => reader.skip_field()?,
        }
    }

    Ok(odp)
}

fn decode_message_options(reader: &mut Reader<'_>) -> Result<MessageOptions, DecodeError> {
    let mut options = MessageOptions::default();

    while reader.next_field()? {
        match reader.field_number() {
            7 => options.map_entry = Some(reader.read_bool()?),
            _ => reader.skip_field()?,
        }
    }

    Ok(options)
}

fn decode_source_code_info(reader: &mut Reader<'_>) -> Result<SourceCodeInfo, DecodeError> {
    let mut info = SourceCodeInfo::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => info.location.push(reader.read_nested(decode_location)?),
            _ => reader.skip_field()?,
        }
    }

    Ok(info)
}

fn decode_location(reader: &mut Reader<'_>) -> Result<Location, DecodeError> {
    let mut location = Location::default();

    while reader.next_field()? {
        match reader.field_number() {
            1 => reader.read_repeated_int32(&mut location.path)?,
            2 => reader.read_repeated_int32(&mut location.span)?,
            3 => location.leading_comments = Some(reader.read_string()?),
            4 => location.trailing_comments = Some(reader.read_string()?),
            6 => location
                .leading_detached_comments
                .push(reader.read_string()?),
            _ => reader.skip_field()?,
        }
    }

    Ok(location)
}

#[cfg(test)]
mod tests {
    use protoquill::Writer;

    use super::*;

    #[test]
    fn test_decode_skips_unknown_fields() {
        let mut writer = Writer::new();
        writer.write_nested(1, |file| {
            file.write_string(1, "shop.proto");
            // FileOptions, not modelled.
            file.write_nested(8, |options| options.write_string(1, "com.shop"));
            file.write_string(2, "shop");
            file.write_string(12, "proto3");
        });

        let fds = decode_file_descriptor_set(&writer.finish()).unwrap();
        assert_eq!(fds.file.len(), 1);
        assert_eq!(fds.file[0].name.as_deref(), Some("shop.proto"));
        assert_eq!(fds.file[0].package(), "shop");
        assert!(fds.file[0].is_proto3());
    }

    #[test]
    fn test_decode_location_unpacked_path() {
        let mut writer = Writer::new();
        writer.write_int32(1, 4);
        writer.write_int32(1, 0);
        writer.write_packed_int32(2, &[1, 0, 12]);
        writer.write_string(3, " A hat.\n");

        let bytes = writer.finish();
        let location = decode_location(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(location.path, vec![4, 0]);
        assert_eq!(location.span, vec![1, 0, 12]);
        assert_eq!(location.leading_comments.as_deref(), Some(" A hat.\n"));
    }

    #[test]
    fn test_decode_truncated() {
        // FileDescriptorSet.file with a length past the end of the buffer.
        let result = decode_file_descriptor_set(&[0x0a, 0x05, 0x0a]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
