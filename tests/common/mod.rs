//! Common test utilities and helpers.
//!
//! Integration tests never depend on sample binaries: every image is built
//! in memory by [`test_utils::PeBuilder`] and, where a real file is needed,
//! written to a temporary file.

#![allow(dead_code)]

pub mod test_utils;

pub use test_utils::*;
