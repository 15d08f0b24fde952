//! Version layer: latest versions from the registry, cached and compared
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│    Cache    │◀────│  Resolver   │
//! │  (fetch)    │     │  (storage)  │     │  (report)   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                                                ▼
//!                                         ┌─────────────┐
//!                                         │   Compare   │
//!                                         │(difference) │
//!                                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: SQLite-backed store of the last known latest version per package
//! - [`compare`]: Classifies how far a declared version is behind the latest one
//! - [`registry`]: Registry trait for fetching the latest version
//! - [`registries`]: Concrete registry implementations (npm)
//! - [`resolver`]: Builds the per-dependency report from cache and registry
//! - [`error`]: Error types for cache and registry operations

pub mod cache;
pub mod compare;
pub mod error;
pub mod registries;
pub mod registry;
pub mod resolver;
