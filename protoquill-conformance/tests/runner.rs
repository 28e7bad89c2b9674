use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use pretty_assertions::assert_eq;
use protoquill::{BinaryCodec, JsonCodec, ProtoEnum};
use protoquill_conformance::proto::conformance::conformance_request::Payload;
use protoquill_conformance::proto::conformance::conformance_response::Result as Outcome;
use protoquill_conformance::proto::conformance::{
    ConformanceRequest, ConformanceResponse, WireFormat,
};
use protoquill_conformance::proto::protobuf_test_messages_proto3::test_all_types_proto3::{
    NestedEnum, NestedMessage, OneofField,
};
use protoquill_conformance::proto::protobuf_test_messages_proto3::{
    ForeignEnum, ForeignMessage, TestAllTypesProto3,
};
use protoquill_conformance::runner::{run_test, serve};

const TEST_ALL_TYPES: &str = "protobuf_test_messages.proto3.TestAllTypesProto3";

fn all_types() -> TestAllTypesProto3 {
    let mut message = TestAllTypesProto3 {
        optional_int32: -12,
        optional_sint64: -3,
        optional_fixed32: 9,
        optional_double: 2.5,
        optional_string: "quill".to_string(),
        optional_bytes: vec![1, 2],
        optional_nested_message: Some(Box::new(NestedMessage {
            a: 5,
            corecursive: Some(Box::new(TestAllTypesProto3 {
                optional_bool: true,
                ..Default::default()
            })),
        })),
        optional_foreign_message: Some(ForeignMessage { c: 8 }),
        optional_nested_enum: NestedEnum::Neg as i32,
        optional_foreign_enum: ForeignEnum::ForeignBaz as i32,
        repeated_int64: vec![1, -1],
        repeated_string: vec!["a".to_string(), "b".to_string()],
        repeated_nested_enum: vec![NestedEnum::Bar as i32],
        oneof_field: Some(OneofField::OneofUint64(u64::MAX)),
        ..Default::default()
    };
    message.map_int32_double.insert(1, 0.5);
    message.map_bool_bool.insert(false, true);
    message
        .map_string_foreign_message
        .insert("k".to_string(), ForeignMessage { c: 1 });
    message
}

fn request(payload: Payload, output: WireFormat) -> ConformanceRequest {
    ConformanceRequest {
        payload: Some(payload),
        requested_output_format: output.to_i32(),
        message_type: TEST_ALL_TYPES.to_string(),
        ..Default::default()
    }
}

#[test]
fn binary_to_binary() {
    let message = all_types();
    let response = run_test(&request(
        Payload::ProtobufPayload(message.encode_binary()),
        WireFormat::Protobuf,
    ));
    let Some(Outcome::ProtobufPayload(bytes)) = &response.result else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(TestAllTypesProto3::decode_binary(bytes).unwrap(), message);
}

#[test]
fn json_to_binary() {
    let message = all_types();
    let response = run_test(&request(
        Payload::JsonPayload(message.encode_json().unwrap()),
        WireFormat::Protobuf,
    ));
    let Some(Outcome::ProtobufPayload(bytes)) = &response.result else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(TestAllTypesProto3::decode_binary(bytes).unwrap(), message);
}

#[test]
fn binary_to_json() {
    let message = TestAllTypesProto3 {
        optional_int64: 1 << 40,
        optional_nested_enum: NestedEnum::Baz as i32,
        ..Default::default()
    };
    let response = run_test(&request(
        Payload::ProtobufPayload(message.encode_binary()),
        WireFormat::Json,
    ));
    let Some(Outcome::JsonPayload(json)) = &response.result else {
        panic!("unexpected response: {response:?}");
    };
    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"optionalInt64": "1099511627776", "optionalNestedEnum": "BAZ"})
    );
}

#[test]
fn json_parse_error() {
    let response = run_test(&request(
        Payload::JsonPayload(r#"{"optionalInt32": "twelve"}"#.to_string()),
        WireFormat::Json,
    ));
    assert!(matches!(response.result, Some(Outcome::ParseError(_))));
}

#[test]
fn serialize_error() {
    let message = TestAllTypesProto3 {
        optional_timestamp: Some(protoquill::wkt::Timestamp::new(i64::MIN, 0)),
        ..Default::default()
    };
    let response = run_test(&request(
        Payload::ProtobufPayload(message.encode_binary()),
        WireFormat::Json,
    ));
    assert!(matches!(response.result, Some(Outcome::SerializeError(_))));
}

fn frame(out: &mut Vec<u8>, request: &ConformanceRequest) {
    let bytes = request.encode_binary();
    out.write_u32::<LittleEndian>(bytes.len() as u32).unwrap();
    out.extend_from_slice(&bytes);
}

#[test]
fn serve_answers_every_frame() {
    let mut input = Vec::new();
    frame(
        &mut input,
        &request(Payload::JsonPayload("{}".to_string()), WireFormat::Protobuf),
    );
    frame(
        &mut input,
        &request(Payload::JspbPayload("[]".to_string()), WireFormat::Json),
    );

    let mut output = Vec::new();
    let served = serve(Cursor::new(input), &mut output).unwrap();
    assert_eq!(served, 2);

    let mut output = Cursor::new(output);
    let mut responses = Vec::new();
    while (output.position() as usize) < output.get_ref().len() {
        let len = output.read_u32::<LittleEndian>().unwrap() as usize;
        let start = output.position() as usize;
        let bytes = &output.get_ref()[start..start + len];
        responses.push(ConformanceResponse::decode_binary(bytes).unwrap());
        output.set_position((start + len) as u64);
    }

    assert_eq!(
        responses,
        vec![
            ConformanceResponse {
                result: Some(Outcome::ProtobufPayload(Vec::new())),
            },
            ConformanceResponse {
                result: Some(Outcome::Skipped("JSPB input not supported".to_string())),
            },
        ]
    );
}

#[test]
fn serve_rejects_truncated_frame() {
    let mut input = Vec::new();
    input.write_u32::<LittleEndian>(10).unwrap();
    input.extend_from_slice(&[0x22, 0x01]);

    assert!(serve(Cursor::new(input), Vec::new()).is_err());
}

#[test]
fn serve_stops_at_end_of_input() {
    assert_eq!(serve(Cursor::new(Vec::new()), Vec::new()).unwrap(), 0);
}
