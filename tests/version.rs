use indexmap::IndexMap;
use tempfile::TempDir;
use version_lens::version::cache::{Cache, VersionStore, cache_key};
use version_lens::version::compare::DifferenceKind;
use version_lens::version::registries::NpmRegistry;
use version_lens::version::resolver::resolve_dependencies;

fn dependencies(entries: &[(&str, &str)]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

#[test]
fn save_latest_version_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let cache = Cache::new(&db_path).unwrap();
        cache.save_latest_version("left-pad", "1.3.0").unwrap();
    }

    let cache = Cache::new(&db_path).unwrap();
    assert_eq!(
        cache.get_latest_version("left-pad").unwrap(),
        Some("1.3.0".to_string())
    );
}

#[test]
fn save_latest_version_overwrites_previous_value() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Cache::new(&temp_dir.path().join("test.db")).unwrap();

    cache.save_latest_version("react", "18.2.0").unwrap();
    cache.save_latest_version("react", "18.3.1").unwrap();

    assert_eq!(
        cache.get_latest_version("react").unwrap(),
        Some("18.3.1".to_string())
    );
}

#[test]
fn cache_key_is_namespaced() {
    assert_eq!(cache_key("left-pad"), "dep-package_left-pad");
    assert_eq!(cache_key("@types/node"), "dep-package_@types/node");
}

#[tokio::test]
async fn resolve_dependencies_against_npm_registry_fills_cache() {
    let mut server = mockito::Server::new_async().await;
    let left_pad = server
        .mock("GET", "/left-pad/latest")
        .with_status(200)
        .with_body(r#"{"name": "left-pad", "version": "1.3.0"}"#)
        .expect(1)
        .create_async()
        .await;
    let private = server
        .mock("GET", "/@acme%2Fprivate/latest")
        .with_status(404)
        .with_body(r#""Not Found""#)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let cache = Cache::new(&temp_dir.path().join("test.db")).unwrap();
    let registry = NpmRegistry::new(&server.url());
    let deps = dependencies(&[("left-pad", "^1.0.0"), ("@acme/private", "^0.1.0")]);

    let report = resolve_dependencies(&deps, &cache, &registry, false).await;

    assert_eq!(report.len(), 1);
    assert_eq!(report["left-pad"].latest_version, "1.3.0");
    assert_eq!(report["left-pad"].version_difference, DifferenceKind::Minor);
    assert_eq!(
        cache.get_latest_version("left-pad").unwrap(),
        Some("1.3.0".to_string())
    );
    assert_eq!(cache.get_latest_version("@acme/private").unwrap(), None);

    // Second pass is served from the cache: left-pad is not fetched again
    let report = resolve_dependencies(&deps, &cache, &registry, false).await;
    assert_eq!(report["left-pad"].latest_version, "1.3.0");

    left_pad.assert_async().await;
    private.assert_async().await;
}

#[tokio::test]
async fn forced_resolution_refetches_cached_dependencies() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/react/latest")
        .with_status(200)
        .with_body(r#"{"version": "19.0.0"}"#)
        .expect(1)
        .create_async()
        .await;

    let temp_dir = TempDir::new().unwrap();
    let cache = Cache::new(&temp_dir.path().join("test.db")).unwrap();
    cache.save_latest_version("react", "18.3.1").unwrap();
    let registry = NpmRegistry::new(&server.url());

    let report =
        resolve_dependencies(&dependencies(&[("react", "^18.2.0")]), &cache, &registry, true).await;

    assert_eq!(report["react"].latest_version, "19.0.0");
    assert_eq!(report["react"].version_difference, DifferenceKind::Major);
    assert_eq!(
        cache.get_latest_version("react").unwrap(),
        Some("19.0.0".to_string())
    );
    mock.assert_async().await;
}
