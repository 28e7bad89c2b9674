//! Generates the conformance protocol messages and the test schemas.
//!
//! The schemas are described with the descriptor builder so the build does
//! not need protoc.

use protoquill_build::descriptor::builder::*;

/// Scalar types in field number order of `TestAllTypesProto3`.
const SCALARS: &[(&str, Type)] = &[
    ("int32", Type::Int32),
    ("int64", Type::Int64),
    ("uint32", Type::Uint32),
    ("uint64", Type::Uint64),
    ("sint32", Type::Sint32),
    ("sint64", Type::Sint64),
    ("fixed32", Type::Fixed32),
    ("fixed64", Type::Fixed64),
    ("sfixed32", Type::Sfixed32),
    ("sfixed64", Type::Sfixed64),
    ("float", Type::Float),
    ("double", Type::Double),
    ("bool", Type::Bool),
    ("string", Type::String),
    ("bytes", Type::Bytes),
];

const TEST_ALL_TYPES: &str = ".protobuf_test_messages.proto3.TestAllTypesProto3";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    let fds = FileDescriptorSet {
        file: vec![
            timestamp(),
            duration(),
            conformance(),
            test_messages_proto3(),
            quill_test(),
        ],
    };
    protoquill_build::Config::new().compile_fds(fds)?;
    Ok(())
}

fn seconds_and_nanos(name: &str) -> DescriptorProto {
    DescriptorProto::new(name)
        .with_field(FieldDescriptorProto::scalar("seconds", 1, Type::Int64))
        .with_field(FieldDescriptorProto::scalar("nanos", 2, Type::Int32))
}

fn timestamp() -> FileDescriptorProto {
    FileDescriptorProto::new("google/protobuf/timestamp.proto", "google.protobuf")
        .with_message(seconds_and_nanos("Timestamp"))
}

fn duration() -> FileDescriptorProto {
    FileDescriptorProto::new("google/protobuf/duration.proto", "google.protobuf")
        .with_message(seconds_and_nanos("Duration"))
}

/// conformance/conformance.proto, the protocol spoken with the test runner.
fn conformance() -> FileDescriptorProto {
    let request = DescriptorProto::new("ConformanceRequest")
        .with_oneof(
            "payload",
            vec![
                FieldDescriptorProto::scalar("protobuf_payload", 1, Type::Bytes),
                FieldDescriptorProto::scalar("json_payload", 2, Type::String),
                FieldDescriptorProto::scalar("jspb_payload", 7, Type::String),
                FieldDescriptorProto::scalar("text_payload", 8, Type::String),
            ],
        )
        .with_field(FieldDescriptorProto::enumeration(
            "requested_output_format",
            3,
            ".conformance.WireFormat",
        ))
        .with_field(FieldDescriptorProto::scalar("message_type", 4, Type::String))
        .with_field(FieldDescriptorProto::enumeration(
            "test_category",
            5,
            ".conformance.TestCategory",
        ))
        .with_field(FieldDescriptorProto::scalar("print_unknown_fields", 9, Type::Bool));

    let response = DescriptorProto::new("ConformanceResponse").with_oneof(
        "result",
        vec![
            FieldDescriptorProto::scalar("parse_error", 1, Type::String),
            FieldDescriptorProto::scalar("serialize_error", 6, Type::String),
            FieldDescriptorProto::scalar("timeout_error", 9, Type::String),
            FieldDescriptorProto::scalar("runtime_error", 2, Type::String),
            FieldDescriptorProto::scalar("protobuf_payload", 3, Type::Bytes),
            FieldDescriptorProto::scalar("json_payload", 4, Type::String),
            FieldDescriptorProto::scalar("skipped", 5, Type::String),
            FieldDescriptorProto::scalar("jspb_payload", 7, Type::String),
            FieldDescriptorProto::scalar("text_payload", 8, Type::String),
        ],
    );

    let failure_set = DescriptorProto::new("FailureSet")
        .with_field(FieldDescriptorProto::scalar("failure", 1, Type::String).repeated());

    FileDescriptorProto::new("conformance/conformance.proto", "conformance")
        .with_enum(EnumDescriptorProto::new(
            "WireFormat",
            &[
                ("UNSPECIFIED", 0),
                ("PROTOBUF", 1),
                ("JSON", 2),
                ("JSPB", 3),
                ("TEXT_FORMAT", 4),
            ],
        ))
        .with_enum(EnumDescriptorProto::new(
            "TestCategory",
            &[
                ("UNSPECIFIED_TEST", 0),
                ("BINARY_TEST", 1),
                ("JSON_TEST", 2),
                ("JSON_IGNORE_UNKNOWN_PARSING_TEST", 3),
                ("JSPB_TEST", 4),
                ("TEXT_FORMAT_TEST", 5),
            ],
        ))
        .with_message(failure_set)
        .with_message(request)
        .with_message(response)
}

/// The proto3 half of google/protobuf/test_messages_proto3.proto, without
/// the wrapper, `Struct`, `Any` and `FieldMask` fields.
fn test_messages_proto3() -> FileDescriptorProto {
    let nested_enum = ".protobuf_test_messages.proto3.TestAllTypesProto3.NestedEnum";
    let nested_message = ".protobuf_test_messages.proto3.TestAllTypesProto3.NestedMessage";
    let foreign_enum = ".protobuf_test_messages.proto3.ForeignEnum";
    let foreign_message = ".protobuf_test_messages.proto3.ForeignMessage";

    let mut message = DescriptorProto::new("TestAllTypesProto3")
        .with_nested(
            DescriptorProto::new("NestedMessage")
                .with_field(FieldDescriptorProto::scalar("a", 1, Type::Int32))
                .with_field(FieldDescriptorProto::message("corecursive", 2, TEST_ALL_TYPES)),
        )
        .with_enum(EnumDescriptorProto::new(
            "NestedEnum",
            &[("FOO", 0), ("BAR", 1), ("BAZ", 2), ("NEG", -1)],
        ));

    for (number, (name, r#type)) in (1..).zip(SCALARS) {
        message = message.with_field(FieldDescriptorProto::scalar(
            &format!("optional_{name}"),
            number,
            *r#type,
        ));
    }
    message = message
        .with_field(FieldDescriptorProto::message("optional_nested_message", 18, nested_message))
        .with_field(FieldDescriptorProto::message("optional_foreign_message", 19, foreign_message))
        .with_field(FieldDescriptorProto::enumeration("optional_nested_enum", 21, nested_enum))
        .with_field(FieldDescriptorProto::enumeration("optional_foreign_enum", 22, foreign_enum))
        .with_field(FieldDescriptorProto::message("recursive_message", 27, TEST_ALL_TYPES));

    for (number, (name, r#type)) in (31..).zip(SCALARS) {
        message = message.with_field(
            FieldDescriptorProto::scalar(&format!("repeated_{name}"), number, *r#type).repeated(),
        );
    }
    message = message
        .with_field(FieldDescriptorProto::message("repeated_nested_message", 48, nested_message).repeated())
        .with_field(FieldDescriptorProto::message("repeated_foreign_message", 49, foreign_message).repeated())
        .with_field(FieldDescriptorProto::enumeration("repeated_nested_enum", 51, nested_enum).repeated())
        .with_field(FieldDescriptorProto::enumeration("repeated_foreign_enum", 52, foreign_enum).repeated());

    let scalar_maps = [
        ("map_int32_int32", Type::Int32, Type::Int32),
        ("map_int64_int64", Type::Int64, Type::Int64),
        ("map_uint32_uint32", Type::Uint32, Type::Uint32),
        ("map_uint64_uint64", Type::Uint64, Type::Uint64),
        ("map_sint32_sint32", Type::Sint32, Type::Sint32),
        ("map_sint64_sint64", Type::Sint64, Type::Sint64),
        ("map_fixed32_fixed32", Type::Fixed32, Type::Fixed32),
        ("map_fixed64_fixed64", Type::Fixed64, Type::Fixed64),
        ("map_sfixed32_sfixed32", Type::Sfixed32, Type::Sfixed32),
        ("map_sfixed64_sfixed64", Type::Sfixed64, Type::Sfixed64),
        ("map_int32_float", Type::Int32, Type::Float),
        ("map_int32_double", Type::Int32, Type::Double),
        ("map_bool_bool", Type::Bool, Type::Bool),
        ("map_string_string", Type::String, Type::String),
        ("map_string_bytes", Type::String, Type::Bytes),
    ];
    for (number, (name, key, value)) in (56..).zip(scalar_maps) {
        message = message.with_map_field(
            name,
            number,
            key,
            FieldDescriptorProto::scalar("value", 2, value),
            TEST_ALL_TYPES,
        );
    }
    message = message
        .with_map_field(
            "map_string_nested_message",
            71,
            Type::String,
            FieldDescriptorProto::message("value", 2, nested_message),
            TEST_ALL_TYPES,
        )
        .with_map_field(
            "map_string_foreign_message",
            72,
            Type::String,
            FieldDescriptorProto::message("value", 2, foreign_message),
            TEST_ALL_TYPES,
        )
        .with_map_field(
            "map_string_nested_enum",
            73,
            Type::String,
            FieldDescriptorProto::enumeration("value", 2, nested_enum),
            TEST_ALL_TYPES,
        )
        .with_map_field(
            "map_string_foreign_enum",
            74,
            Type::String,
            FieldDescriptorProto::enumeration("value", 2, foreign_enum),
            TEST_ALL_TYPES,
        );

    message = message
        .with_oneof(
            "oneof_field",
            vec![
                FieldDescriptorProto::scalar("oneof_uint32", 111, Type::Uint32),
                FieldDescriptorProto::message("oneof_nested_message", 112, nested_message),
                FieldDescriptorProto::scalar("oneof_string", 113, Type::String),
                FieldDescriptorProto::scalar("oneof_bytes", 114, Type::Bytes),
                FieldDescriptorProto::scalar("oneof_bool", 115, Type::Bool),
                FieldDescriptorProto::scalar("oneof_uint64", 116, Type::Uint64),
                FieldDescriptorProto::scalar("oneof_float", 117, Type::Float),
                FieldDescriptorProto::scalar("oneof_double", 118, Type::Double),
                FieldDescriptorProto::enumeration("oneof_enum", 119, nested_enum),
            ],
        )
        .with_field(FieldDescriptorProto::message(
            "optional_duration",
            301,
            ".google.protobuf.Duration",
        ))
        .with_field(FieldDescriptorProto::message(
            "optional_timestamp",
            302,
            ".google.protobuf.Timestamp",
        ))
        .with_field(FieldDescriptorProto::message(
            "repeated_duration",
            311,
            ".google.protobuf.Duration",
        ).repeated())
        .with_field(FieldDescriptorProto::message(
            "repeated_timestamp",
            312,
            ".google.protobuf.Timestamp",
        ).repeated());

    FileDescriptorProto::new(
        "google/protobuf/test_messages_proto3.proto",
        "protobuf_test_messages.proto3",
    )
    .with_dependency("google/protobuf/duration.proto")
    .with_dependency("google/protobuf/timestamp.proto")
    .with_enum(EnumDescriptorProto::new(
        "ForeignEnum",
        &[("FOREIGN_FOO", 0), ("FOREIGN_BAR", 1), ("FOREIGN_BAZ", 2)],
    ))
    .with_message(message)
    .with_message(
        DescriptorProto::new("ForeignMessage")
            .with_field(FieldDescriptorProto::scalar("c", 1, Type::Int32)),
    )
}

/// Small schemas exercised by the end-to-end tests.
fn quill_test() -> FileDescriptorProto {
    let hat = DescriptorProto::new("Hat")
        .with_field(FieldDescriptorProto::scalar("inches", 1, Type::Int32))
        .with_field(FieldDescriptorProto::scalar("color", 2, Type::String))
        .with_field(FieldDescriptorProto::scalar("name", 3, Type::String));

    let mut scalars = DescriptorProto::new("Scalars");
    for (number, (name, r#type)) in (1..).zip(SCALARS) {
        scalars = scalars.with_field(FieldDescriptorProto::scalar(
            &format!("{name}_field"),
            number,
            *r#type,
        ));
    }

    let wardrobe = DescriptorProto::new("Wardrobe")
        .with_field(FieldDescriptorProto::message("hats", 1, ".quill.test.Hat").repeated())
        .with_field(FieldDescriptorProto::scalar("sizes", 2, Type::Int32).repeated())
        .with_field(FieldDescriptorProto::scalar("labels", 3, Type::String).repeated())
        .with_field(FieldDescriptorProto::enumeration("styles", 4, ".quill.test.Style").repeated())
        .with_map_field(
            "stock",
            5,
            Type::String,
            FieldDescriptorProto::scalar("value", 2, Type::Uint64),
            ".quill.test.Wardrobe",
        )
        .with_map_field(
            "by_id",
            6,
            Type::Int32,
            FieldDescriptorProto::message("value", 2, ".quill.test.Hat"),
            ".quill.test.Wardrobe",
        )
        .with_field(FieldDescriptorProto::enumeration("favorite", 7, ".quill.test.Style"))
        .with_field(FieldDescriptorProto::scalar("nickname", 8, Type::String).optional())
        .with_field(FieldDescriptorProto::scalar("count", 9, Type::Int32).optional())
        .with_field(FieldDescriptorProto::message("featured", 10, ".quill.test.Hat"))
        .with_oneof(
            "display",
            vec![
                FieldDescriptorProto::scalar("shelf", 11, Type::Uint32),
                FieldDescriptorProto::scalar("window", 12, Type::String),
                FieldDescriptorProto::message("mannequin", 13, ".quill.test.Hat"),
            ],
        )
        .with_field(FieldDescriptorProto::message(
            "opened_at",
            14,
            ".google.protobuf.Timestamp",
        ))
        .with_field(FieldDescriptorProto::message(
            "open_for",
            15,
            ".google.protobuf.Duration",
        ));

    let tree = DescriptorProto::new("Tree")
        .with_field(FieldDescriptorProto::scalar("value", 1, Type::Int32))
        .with_field(FieldDescriptorProto::message("left", 2, ".quill.test.Tree"))
        .with_field(FieldDescriptorProto::message("right", 3, ".quill.test.Tree"))
        .with_field(FieldDescriptorProto::message("children", 4, ".quill.test.Tree").repeated());

    FileDescriptorProto::new("quill/test.proto", "quill.test")
        .with_dependency("google/protobuf/duration.proto")
        .with_dependency("google/protobuf/timestamp.proto")
        .with_enum(EnumDescriptorProto::new(
            "Style",
            &[
                ("STYLE_UNSPECIFIED", 0),
                ("STYLE_FEDORA", 1),
                ("STYLE_BERET", 2),
                ("STYLE_BOWLER", -3),
            ],
        ))
        .with_message(hat)
        .with_message(scalars)
        .with_message(wardrobe)
        .with_message(tree)
}
