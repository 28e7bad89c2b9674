//! Conformance test runner binary for protoquill.
//!
//! Run it under the protobuf conformance test runner:
//!
//! ```text
//! conformance_test_runner target/release/conformance-quill
//! ```

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("protoquill conformance runner starting");
    let stdin = std::io::stdin().lock();
    let stdout = std::io::stdout().lock();
    protoquill_conformance::runner::serve(stdin, stdout)?;
    Ok(())
}
