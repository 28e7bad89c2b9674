//! protoc plugin for protoquill.
//!
//! Reads a `CodeGeneratorRequest` from stdin and writes the
//! `CodeGeneratorResponse` to stdout. Logs go to stderr, filtered by
//! `RUST_LOG`.

use std::io::{Read, Write};

use protoquill_build::plugin::{self, CodeGeneratorRequest};
use protoquill_build::Error;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;
    let request = CodeGeneratorRequest::decode(&input)?;
    debug!(
        files = request.file_to_generate.len(),
        parameter = request.parameter.as_deref().unwrap_or(""),
        "received request"
    );

    let response = plugin::run(&request);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&response.encode())?;
    stdout.flush()?;
    Ok(())
}
