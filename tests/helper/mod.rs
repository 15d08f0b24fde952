//! Shared utilities for integration tests

pub mod lsp;
pub mod registry;

pub use lsp::*;
pub use registry::*;
