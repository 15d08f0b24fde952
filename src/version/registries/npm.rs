//! npm registry API implementation

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use serde::Deserialize;
use tracing::{debug, error, warn};

/// Default base URL for npm registry
pub const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

const USER_AGENT: &str = "version-lens";

/// Response from the `/{package}/latest` endpoint
#[derive(Debug, Deserialize)]
struct NpmLatestResponse {
    version: String,
}

/// Registry implementation for npm registry API
#[derive(Clone)]
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL.
    ///
    /// Falls back to a default client, without the user agent, when the
    /// configured one cannot be built.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .inspect_err(|e| {
                    error!("Failed to build HTTP client, falling back to defaults: {}", e)
                })
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_latest_version(&self, package_name: &str) -> Result<String, RegistryError> {
        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}/latest", self.base_url, encoded_name);
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let latest: NpmLatestResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        Ok(latest.version)
    }
}
