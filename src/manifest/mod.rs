//! Manifest layer
//! - mod.rs: loading package.json and merging its dependency sections
//! - locate.rs: finding dependency entries in the manifest text

pub mod locate;

use std::path::Path;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

pub use locate::{DependencyLocation, TextPosition, TextRange, locate_dependencies};

/// Error type for manifest loading
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A loaded package.json
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// Raw file content, used to place annotations
    pub text: String,
    pub dependencies: IndexMap<String, String>,
    pub dev_dependencies: IndexMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: IndexMap<String, serde_json::Value>,
}

/// Keep only string-valued entries
fn string_entries(section: IndexMap<String, serde_json::Value>) -> IndexMap<String, String> {
    section
        .into_iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::String(version) => Some((name, version)),
            _ => None,
        })
        .collect()
}

impl Manifest {
    /// Parse package.json content
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let package: PackageJson = serde_json::from_str(text)?;

        Ok(Self {
            text: text.to_string(),
            dependencies: string_entries(package.dependencies),
            dev_dependencies: string_entries(package.dev_dependencies),
        })
    }

    /// Regular and development dependencies as one map.
    ///
    /// Regular entries come first, in manifest order, followed by development
    /// entries not already declared as regular ones. A development entry never
    /// overrides a regular entry of the same name.
    pub fn merged_dependencies(&self) -> IndexMap<String, String> {
        let mut merged = self.dependencies.clone();
        for (name, version) in &self.dev_dependencies {
            merged
                .entry(name.clone())
                .or_insert_with(|| version.clone());
        }
        merged
    }
}

/// Source of manifests, keyed by file location
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<Manifest, ManifestError>;
}

/// Reads manifests from the file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FileManifestSource;

#[async_trait]
impl ManifestSource for FileManifestSource {
    async fn load(&self, path: &Path) -> Result<Manifest, ManifestError> {
        debug!("Loading manifest {:?}", path);
        let text = tokio::fs::read_to_string(path).await?;
        Manifest::parse(&text)
    }
}
