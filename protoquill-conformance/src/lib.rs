//! Conformance testing for protoquill.
//!
//! `conformance-quill` speaks the protocol of the protobuf conformance test
//! runner. The messages it exchanges, and the messages under test, are
//! generated by `protoquill-build` in `build.rs`.

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/mod.rs"));
}

pub mod runner;
