//! Shared code for the exporter binaries

pub mod common;
