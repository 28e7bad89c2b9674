//! The protoc plugin protocol.
//!
//! protoc runs `protoc-gen-quill` with a serialized `CodeGeneratorRequest` on
//! stdin and reads a `CodeGeneratorResponse` from stdout. Only the fields of
//! google/protobuf/compiler/plugin.proto the generator uses are modelled.

use protoquill::{DecodeError, Reader, Writer};
use tracing::{error, info};

use crate::codegen::generate;
use crate::config::Config;
use crate::descriptor::{
    decode_file_descriptor_proto, encode_file_descriptor_proto, FileDescriptorProto,
    FileDescriptorSet,
};

/// `CodeGeneratorResponse.Feature.FEATURE_PROTO3_OPTIONAL`
pub const FEATURE_PROTO3_OPTIONAL: u64 = 1;

/// Corresponds to google.protobuf.compiler.CodeGeneratorRequest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeGeneratorRequest {
    /// Files named on the protoc command line.
    pub file_to_generate: Vec<String>, // field 1
    pub parameter: Option<String>, // field 2
    /// Every file in `file_to_generate` and everything they import, in
    /// topological order.
    pub proto_file: Vec<FileDescriptorProto>, // field 15
}

/// Corresponds to google.protobuf.compiler.CodeGeneratorResponse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeGeneratorResponse {
    /// Set when the input was valid but could not be generated.
    pub error: Option<String>, // field 1
    pub supported_features: u64, // field 2
    pub file: Vec<ResponseFile>, // field 15
}

/// Corresponds to google.protobuf.compiler.CodeGeneratorResponse.File.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFile {
    pub name: String, // field 1
    pub content: String, // field 15
}

impl CodeGeneratorRequest {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let mut request = CodeGeneratorRequest::default();

        while reader.next_field()? {
            match reader.field_number() {
                1 => request.file_to_generate.push(reader.read_string()?),
                2 => request.parameter = Some(reader.read_string()?),
                15 => request
                    .proto_file
                    .push(reader.read_nested(decode_file_descriptor_proto)?),
                _ => reader.skip_field()?,
            }
        }

        Ok(request)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        for file in &self.file_to_generate {
            writer.write_string(1, file);
        }
        if let Some(parameter) = &self.parameter {
            writer.write_string(2, parameter);
        }
        for file in &self.proto_file {
            writer.write_nested(15, |nested| encode_file_descriptor_proto(file, nested));
        }
        writer.finish()
    }
}

impl CodeGeneratorResponse {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(data);
        let mut response = CodeGeneratorResponse::default();

        while reader.next_field()? {
            match reader.field_number() {
                1 => response.error = Some(reader.read_string()?),
                2 => response.supported_features = reader.read_uint64()?,
                15 => response.file.push(reader.read_nested(|nested| {
                    let mut file = ResponseFile::default();
                    while nested.next_field()? {
                        match nested.field_number() {
                            1 => file.name = nested.read_string()?,
                            15 => file.content = nested.read_string()?,
                            _ => nested.skip_field()?,
                        }
                    }
                    Ok(file)
                })?),
                _ => reader.skip_field()?,
            }
        }

        Ok(response)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        if let Some(error) = &self.error {
            writer.write_string(1, error);
        }
        if self.supported_features != 0 {
            writer.write_uint64(2, self.supported_features);
        }
        for file in &self.file {
            writer.write_nested(15, |nested| {
                nested.write_string(1, &file.name);
                nested.write_string(15, &file.content);
            });
        }
        writer.finish()
    }
}

/// Generates the response for `request`.
///
/// Generation failures are reported through `error`, which protoc prints, so
/// this never fails itself.
pub fn run(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let mut response = CodeGeneratorResponse {
        supported_features: FEATURE_PROTO3_OPTIONAL,
        ..Default::default()
    };

    let config = match Config::from_parameter(request.parameter.as_deref().unwrap_or("")) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid plugin parameter");
            response.error = Some(err.to_string());
            return response;
        }
    };

    let fds = FileDescriptorSet {
        file: request.proto_file.clone(),
    };
    match generate(&config, &fds, Some(&request.file_to_generate)) {
        Ok(files) => {
            info!(files = files.len(), "generated");
            response.file = files
                .into_iter()
                .map(|file| ResponseFile {
                    name: file.name,
                    content: file.content,
                })
                .collect();
        }
        Err(err) => {
            error!(%err, "generation failed");
            response.error = Some(err.to_string());
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::builder::*;

    fn request(parameter: Option<&str>) -> CodeGeneratorRequest {
        let hat = DescriptorProto::new("Hat")
            .with_field(FieldDescriptorProto::scalar("inches", 1, Type::Int32));
        CodeGeneratorRequest {
            file_to_generate: vec!["shop.proto".to_string()],
            parameter: parameter.map(str::to_string),
            proto_file: vec![FileDescriptorProto::new("shop.proto", "shop").with_message(hat)],
        }
    }

    #[test]
    fn test_request_decodes() {
        let request = request(Some("target=rust"));
        let decoded = CodeGeneratorRequest::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_run_generates_files() {
        let response = run(&request(None));
        assert_eq!(response.error, None);
        assert_eq!(response.supported_features, FEATURE_PROTO3_OPTIONAL);

        let names: Vec<&str> = response.file.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["shop.rs", "mod.rs"]);

        let decoded = CodeGeneratorResponse::decode(&response.encode()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_run_reports_errors() {
        let response = run(&request(Some("target=go")));
        assert!(response.file.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("unsupported target 'go', the only supported target is 'rust'")
        );
    }
}
