//! `protoquill-build` compiles `.proto` files into Rust code for use with the
//! protoquill runtime.
//!
//! Every message becomes a plain struct, a `...Partial` struct accepted by
//! `Message::initialize`, and impls of `BinaryCodec` and `JsonCodec`. Every
//! enum becomes a Rust enum implementing `ProtoEnum`, fields of enum type
//! keep the raw `i32` so unknown values survive a round trip.
//!
//! # Example
//!
//! ```rust,no_run
//! // In build.rs
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     protoquill_build::compile_protos(&["src/messages.proto"], &["src/"])?;
//!     Ok(())
//! }
//! ```
//!
//! The generated `mod.rs` declares one module per package:
//!
//! ```rust,ignore
//! pub mod proto {
//!     include!(concat!(env!("OUT_DIR"), "/mod.rs"));
//! }
//! ```
//!
//! # Automatic Boxing of Recursive Types
//!
//! Recursive protobuf types (messages that reference themselves directly or
//! indirectly) are automatically detected and wrapped in `Box<T>` to ensure
//! the generated Rust types have a known size at compile time.
//!
//! ```protobuf
//! message Node {
//!   Node left = 1;   // Generates: Option<Box<Node>>
//!   repeated Node children = 2;  // Generates: Vec<Node>
//! }
//! ```
//!
//! # Advanced Usage
//!
//! ```rust,no_run
//! fn main() -> Result<(), protoquill_build::Error> {
//!     protoquill_build::Config::new()
//!         .out_dir("src/proto")
//!         .extern_path(".money", "::money")
//!         .compile_protos(&["proto/messages.proto"], &["proto/"])?;
//!     Ok(())
//! }
//! ```
//!
//! The same generator runs as a protoc plugin, `protoc-gen-quill`:
//!
//! ```text
//! protoc --quill_out=src/proto --quill_opt=target=rust shop.proto
//! ```

mod codegen;
mod config;
mod context;
pub mod descriptor;
mod error;
pub mod plugin;
mod protoc;

pub use codegen::{generate, GeneratedFile};
pub use config::Config;
pub use error::Error;

use std::path::Path;

/// Compile `.proto` files into Rust with default settings.
///
/// # Arguments
/// * `protos` - Paths to `.proto` files to compile
/// * `includes` - Include paths for resolving imports
///
/// # Example
///
/// ```rust,no_run
/// fn main() -> Result<(), protoquill_build::Error> {
///     protoquill_build::compile_protos(&["proto/messages.proto"], &["proto/"])?;
///     Ok(())
/// }
/// ```
pub fn compile_protos(
    protos: &[impl AsRef<Path>],
    includes: &[impl AsRef<Path>],
) -> Result<(), Error> {
    Config::new().compile_protos(protos, includes)
}
