//! End-to-end extraction tests.

mod handles;
mod headers;
