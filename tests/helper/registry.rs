//! Registry and cache test utilities

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tower_lsp::lsp_types::Url;

use version_lens::version::cache::{Cache, VersionStore};
use version_lens::version::error::RegistryError;
use version_lens::version::registry::Registry;

/// Registry answering from an in-memory table; unknown packages are not found
#[derive(Default)]
pub struct StubRegistry {
    latest: Mutex<HashMap<String, String>>,
    lookups: AtomicUsize,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(self, package: &str, version: &str) -> Self {
        self.set_latest(package, version);
        self
    }

    pub fn set_latest(&self, package: &str, version: &str) {
        self.latest
            .lock()
            .unwrap()
            .insert(package.to_string(), version.to_string());
    }

    #[allow(dead_code)]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for StubRegistry {
    async fn fetch_latest_version(&self, package_name: &str) -> Result<String, RegistryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.latest
            .lock()
            .unwrap()
            .get(package_name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))
    }
}

/// Create a file-backed cache seeded with latest versions
pub fn create_test_cache(latest: &[(&str, &str)]) -> (TempDir, Arc<Cache>) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let cache = Cache::new(&db_path).unwrap();

    for (package_name, version) in latest {
        cache.save_latest_version(package_name, version).unwrap();
    }

    (temp_dir, Arc::new(cache))
}

/// Write a package.json into a fresh directory, returning its path and file URI
pub fn write_manifest(content: &str) -> (TempDir, PathBuf, Url) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("package.json");
    std::fs::write(&path, content).unwrap();
    let uri = Url::from_file_path(&path).unwrap();
    (temp_dir, path, uri)
}
