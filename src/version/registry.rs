//! Registry trait for looking up the latest published version of a package

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;

/// Trait for fetching the latest published version from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the version currently tagged as latest
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "lodash", "@types/node")
    ///
    /// # Returns
    /// * `Ok(String)` - The latest version as published, not validated
    /// * `Err(RegistryError)` - Unknown package, transport failure or malformed payload
    async fn fetch_latest_version(&self, package_name: &str) -> Result<String, RegistryError>;
}
