//! Dependency resolution: latest version per dependency, from cache or registry

use std::time::Duration;

use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::version::cache::VersionStore;
use crate::version::compare::{DifferenceKind, compare};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;

/// Status of a single dependency in a [`DependencyReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatus {
    /// Version range as declared in the manifest
    pub current_version: String,
    /// Latest version as published by the registry
    pub latest_version: String,
    pub version_difference: DifferenceKind,
}

/// Per-dependency status, in manifest order.
///
/// Dependencies whose latest version is unknown are never present.
pub type DependencyReport = IndexMap<String, DependencyStatus>;

/// Number of dependencies behind their latest version, and the most severe gap.
///
/// `Invalid` entries never count as the most severe.
pub fn summarize(report: &DependencyReport) -> (usize, Option<DifferenceKind>) {
    let outdated = report
        .values()
        .filter(|status| status.version_difference.is_update())
        .count();
    let most_severe = report
        .values()
        .map(|status| status.version_difference)
        .filter_map(|kind| kind.severity().map(|rank| (rank, kind)))
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, kind)| kind);

    (outdated, most_severe)
}

/// Fetch the latest version and store it in the cache.
///
/// Returns `None` when the registry lookup fails; nothing is written then.
async fn fetch_and_cache_latest<S: VersionStore + ?Sized>(
    store: &S,
    registry: &dyn Registry,
    package_name: &str,
) -> Option<String> {
    let latest = match registry.fetch_latest_version(package_name).await {
        Ok(latest) => latest,
        Err(RegistryError::NotFound(_)) => {
            info!(
                "Package not found in registry: {}. Skipping (private or unpublished?)",
                package_name
            );
            return None;
        }
        Err(e) => {
            error!("Failed to fetch latest version for {}: {}", package_name, e);
            return None;
        }
    };

    // A failed write only costs a refetch next time
    let _ = store
        .save_latest_version(package_name, &latest)
        .inspect_err(|e| error!("Failed to cache latest version for {}: {}", package_name, e));

    Some(latest)
}

/// Cached latest version, a read failure counts as a miss
fn cached_latest<S: VersionStore + ?Sized>(store: &S, package_name: &str) -> Option<String> {
    let cached = store
        .get_latest_version(package_name)
        .inspect_err(|e| error!("Failed to read cache for {}: {}", package_name, e))
        .ok()
        .flatten()?;

    debug!("Cache hit for {}: {}", package_name, cached);
    Some(cached)
}

/// Resolve the latest version of every dependency and classify the gap.
///
/// With `force_refresh` every dependency is looked up again and the cache is
/// overwritten; otherwise only dependencies missing from the cache are
/// looked up. Lookups run concurrently, their start times staggered in the
/// order of the lookups alone. A failed lookup drops that dependency from the
/// report and never aborts the pass.
pub async fn resolve_dependencies<S: VersionStore + ?Sized>(
    dependencies: &IndexMap<String, String>,
    store: &S,
    registry: &dyn Registry,
    force_refresh: bool,
) -> DependencyReport {
    let mut lookups = 0u64;
    let futures: Vec<_> = dependencies
        .iter()
        .map(|(name, declared)| {
            let cached = if force_refresh {
                None
            } else {
                cached_latest(store, name)
            };
            let stagger = match cached {
                Some(_) => Duration::ZERO,
                None => {
                    lookups += 1;
                    Duration::from_millis(FETCH_STAGGER_DELAY_MS * (lookups - 1))
                }
            };

            async move {
                let latest = match cached {
                    Some(latest) => latest,
                    None => {
                        sleep(stagger).await;
                        fetch_and_cache_latest(store, registry, name).await?
                    }
                };
                let version_difference = compare(declared, &format!("^{}", latest));
                Some((
                    name.clone(),
                    DependencyStatus {
                        current_version: declared.clone(),
                        latest_version: latest,
                        version_difference,
                    },
                ))
            }
        })
        .collect();

    let report: DependencyReport = join_all(futures).await.into_iter().flatten().collect();

    debug!(
        "Resolved {} of {} dependencies (force_refresh: {})",
        report.len(),
        dependencies.len(),
        force_refresh
    );

    report
}
