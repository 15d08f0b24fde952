//! Registry implementations for fetching latest package versions

pub mod npm;

pub use npm::NpmRegistry;
