pub mod annotation;
pub mod config;
pub mod lsp;
pub mod manifest;
pub mod refresh;
pub mod version;
