//! Answers conformance requests.
//!
//! Requests arrive framed by a little-endian `u32` length. Each one names a
//! message type, carries a payload in one wire format and asks for the
//! message back in another.

use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use protoquill::{BinaryCodec, JsonCodec, ProtoEnum};
use tracing::{debug, info};

use crate::proto::conformance::conformance_request::Payload;
use crate::proto::conformance::conformance_response::Result as Outcome;
use crate::proto::conformance::{ConformanceRequest, ConformanceResponse, FailureSet, WireFormat};
use crate::proto::protobuf_test_messages_proto3::TestAllTypesProto3;
use crate::proto::quill_test::{Hat, Scalars, Tree, Wardrobe};

/// Runs one test.
pub fn run_test(request: &ConformanceRequest) -> ConformanceResponse {
    let outcome = match request.message_type.as_str() {
        // The runner asks for the list of expected failures first.
        "conformance.FailureSet" => Outcome::ProtobufPayload(FailureSet::default().encode_binary()),
        "protobuf_test_messages.proto3.TestAllTypesProto3" => {
            roundtrip::<TestAllTypesProto3>(request)
        }
        "quill.test.Hat" => roundtrip::<Hat>(request),
        "quill.test.Scalars" => roundtrip::<Scalars>(request),
        "quill.test.Tree" => roundtrip::<Tree>(request),
        "quill.test.Wardrobe" => roundtrip::<Wardrobe>(request),
        other => Outcome::RuntimeError(format!("Message type {other} not supported")),
    };

    ConformanceResponse {
        result: Some(outcome),
    }
}

fn roundtrip<M: BinaryCodec + JsonCodec>(request: &ConformanceRequest) -> Outcome {
    let decoded = match &request.payload {
        Some(Payload::ProtobufPayload(data)) => M::decode_binary(data),
        Some(Payload::JsonPayload(text)) => M::decode_json(text),
        Some(Payload::JspbPayload(_)) => {
            return Outcome::Skipped("JSPB input not supported".to_string())
        }
        Some(Payload::TextPayload(_)) => {
            return Outcome::Skipped("Text format input not supported".to_string())
        }
        None => return Outcome::RuntimeError("No input payload specified".to_string()),
    };
    let message = match decoded {
        Ok(message) => message,
        Err(err) => {
            debug!(message_type = M::NAME, %err, "parse error");
            return Outcome::ParseError(format!("Failed to parse {}: {err}", M::NAME));
        }
    };

    match WireFormat::from_i32(request.requested_output_format) {
        Some(WireFormat::Protobuf) => Outcome::ProtobufPayload(message.encode_binary()),
        Some(WireFormat::Json) => match message.encode_json() {
            Ok(json) => Outcome::JsonPayload(json),
            Err(err) => Outcome::SerializeError(err.to_string()),
        },
        Some(WireFormat::Jspb) => Outcome::Skipped("JSPB output not supported".to_string()),
        Some(WireFormat::TextFormat) => {
            Outcome::Skipped("Text format output not supported".to_string())
        }
        Some(WireFormat::Unspecified) | None => {
            Outcome::Skipped("Output format unspecified".to_string())
        }
    }
}

/// Answers framed requests from `input` until it ends, returning the number
/// of requests served.
pub fn serve(mut input: impl Read, mut output: impl Write) -> Result<usize> {
    let mut served = 0;

    loop {
        let len = match input.read_u32::<LittleEndian>() {
            Ok(len) => len,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err).context("failed to read request length"),
        };

        let mut request_bytes = vec![0u8; len as usize];
        input
            .read_exact(&mut request_bytes)
            .context("failed to read request")?;
        let request = ConformanceRequest::decode_binary(&request_bytes)
            .context("failed to decode ConformanceRequest")?;
        debug!(
            message_type = %request.message_type,
            output = request.requested_output_format,
            "request"
        );

        let response_bytes = run_test(&request).encode_binary();
        let Ok(response_len) = u32::try_from(response_bytes.len()) else {
            bail!("response of {} bytes does not fit a frame", response_bytes.len());
        };
        output.write_u32::<LittleEndian>(response_len)?;
        output.write_all(&response_bytes)?;
        output.flush()?;
        served += 1;
    }

    info!(served, "input closed");
    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(payload: Payload, output: WireFormat) -> ConformanceRequest {
        ConformanceRequest {
            payload: Some(payload),
            requested_output_format: output.to_i32(),
            message_type: "quill.test.Hat".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_binary_to_json() {
        let hat = Hat {
            inches: 3,
            ..Default::default()
        };
        let response = run_test(&request(
            Payload::ProtobufPayload(hat.encode_binary()),
            WireFormat::Json,
        ));
        assert_eq!(
            response.result,
            Some(Outcome::JsonPayload(r#"{"inches":3}"#.to_string()))
        );
    }

    #[test]
    fn test_parse_error() {
        let response = run_test(&request(
            Payload::ProtobufPayload(vec![0x08]),
            WireFormat::Protobuf,
        ));
        assert!(matches!(response.result, Some(Outcome::ParseError(_))));
    }

    #[test]
    fn test_skipped_formats() {
        let text = run_test(&request(
            Payload::TextPayload("inches: 3".to_string()),
            WireFormat::Protobuf,
        ));
        assert!(matches!(text.result, Some(Outcome::Skipped(_))));

        let unspecified = run_test(&request(
            Payload::JsonPayload("{}".to_string()),
            WireFormat::Unspecified,
        ));
        assert!(matches!(unspecified.result, Some(Outcome::Skipped(_))));
    }

    #[test]
    fn test_runtime_errors() {
        let mut missing = request(Payload::JsonPayload("{}".to_string()), WireFormat::Json);
        missing.payload = None;
        assert_eq!(
            run_test(&missing).result,
            Some(Outcome::RuntimeError("No input payload specified".to_string()))
        );

        let mut unknown = request(Payload::JsonPayload("{}".to_string()), WireFormat::Json);
        unknown.message_type = "shop.Scarf".to_string();
        assert!(matches!(
            run_test(&unknown).result,
            Some(Outcome::RuntimeError(_))
        ));
    }

    #[test]
    fn test_failure_set_is_empty() {
        let mut request = request(Payload::ProtobufPayload(Vec::new()), WireFormat::Protobuf);
        request.message_type = "conformance.FailureSet".to_string();
        assert_eq!(
            run_test(&request).result,
            Some(Outcome::ProtobufPayload(Vec::new()))
        );
    }
}
