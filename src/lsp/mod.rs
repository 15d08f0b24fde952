//! LSP (Language Server Protocol) implementation layer
//!
//! Annotations are delivered to the editor as inlay hints.
//!
//! # Modules
//!
//! - [`backend`]: Main LSP backend implementing `LanguageServer` trait
//! - [`surface`]: Keeps annotations per open manifest and converts them to inlay hints
//! - [`server`]: LSP server initialization and lifecycle

pub mod backend;
pub mod server;
pub mod surface;
