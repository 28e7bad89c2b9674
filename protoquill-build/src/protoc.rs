//! Running protoc to turn `.proto` files into a `FileDescriptorSet`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::descriptor::{decode_file_descriptor_set, FileDescriptorSet};
use crate::Error;

/// Locates protoc. `PROTOC` wins over the search of `PATH`.
pub fn find_protoc() -> Result<PathBuf, Error> {
    match std::env::var_os("PROTOC") {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_file() {
                Ok(path)
            } else {
                warn!(path = %path.display(), "PROTOC does not name a file");
                Err(Error::ProtocNotFound)
            }
        }
        None => which::which("protoc").map_err(|_| Error::ProtocNotFound),
    }
}

/// Command line arguments for one protoc run writing its descriptor set to
/// `out`.
fn arguments(
    out: &Path,
    protos: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
    extra_args: &[String],
) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    for include in includes {
        args.push("-I".into());
        args.push(include.as_ref().into());
    }

    let mut descriptor_set_out = OsString::from("--descriptor_set_out=");
    descriptor_set_out.push(out);
    args.push(descriptor_set_out);
    // Imports resolve every referenced type, source info carries comments.
    args.push("--include_imports".into());
    args.push("--include_source_info".into());

    args.extend(extra_args.iter().map(OsString::from));
    args.extend(protos.iter().map(|proto| proto.as_ref().into()));
    args
}

/// Runs `protoc` over `protos` and decodes the descriptor set it writes.
pub fn invoke_protoc(
    protoc: &Path,
    protos: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
    extra_args: &[String],
) -> Result<FileDescriptorSet, Error> {
    let scratch = tempfile::tempdir()?;
    let out = scratch.path().join("descriptors.pb");

    let args = arguments(&out, protos, includes, extra_args);
    debug!(protoc = %protoc.display(), ?args, "running protoc");
    let output = Command::new(protoc).args(&args).output()?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let report: Vec<&str> = [stdout.trim(), stderr.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect();
        return Err(Error::ProtocFailed(report.join("\n")));
    }
    if !stderr.trim().is_empty() {
        warn!(output = %stderr.trim(), "protoc reported warnings");
    }

    decode_file_descriptor_set(&std::fs::read(&out)?)
}
