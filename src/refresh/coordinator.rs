//! Decides when a manifest is resolved and whether the cache is trusted

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, info, warn};

use crate::annotation::{AnnotationSurface, build_annotations};
use crate::manifest::{ManifestSource, locate_dependencies};
use crate::refresh::visits::{PassGenerations, VisitCounter};
use crate::version::cache::VersionStore;
use crate::version::registry::Registry;
use crate::version::resolver::{DependencyReport, resolve_dependencies};

/// Owns the version cache and visit counter and runs resolution passes.
///
/// Entry points are invoked by host wiring:
/// - [`on_manifest_opened`](Self::on_manifest_opened) / [`on_manifest_changed`](Self::on_manifest_changed):
///   trust the cache, fetch only what is missing
/// - [`on_tick`](Self::on_tick): force a full refetch of the watched manifest
///
/// The first non-forced pass for a path schedules one forced pass shortly
/// after, so a cold cache is filled without delaying the first render.
pub struct RefreshCoordinator<S: VersionStore> {
    store: Arc<S>,
    registry: Arc<dyn Registry>,
    manifests: Arc<dyn ManifestSource>,
    surface: Arc<dyn AnnotationSurface>,
    visits: Arc<VisitCounter>,
    generations: Arc<PassGenerations>,
    follow_up_delay: Duration,
    watched_manifest: Option<PathBuf>,
}

impl<S: VersionStore> Clone for RefreshCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
            manifests: self.manifests.clone(),
            surface: self.surface.clone(),
            visits: self.visits.clone(),
            generations: self.generations.clone(),
            follow_up_delay: self.follow_up_delay,
            watched_manifest: self.watched_manifest.clone(),
        }
    }
}

impl<S: VersionStore> RefreshCoordinator<S> {
    pub fn new(
        store: Arc<S>,
        registry: Arc<dyn Registry>,
        manifests: Arc<dyn ManifestSource>,
        surface: Arc<dyn AnnotationSurface>,
    ) -> Self {
        Self {
            store,
            registry,
            manifests,
            surface,
            visits: Arc::new(VisitCounter::new()),
            generations: Arc::new(PassGenerations::new()),
            follow_up_delay: Duration::from_millis(crate::config::DEFAULT_FOLLOW_UP_DELAY_MS),
            watched_manifest: None,
        }
    }

    pub fn with_follow_up_delay(mut self, delay: Duration) -> Self {
        self.follow_up_delay = delay;
        self
    }

    /// Manifest refreshed by [`on_tick`](Self::on_tick)
    pub fn with_watched_manifest(mut self, path: PathBuf) -> Self {
        self.watched_manifest = Some(path);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Number of passes run for `path` so far
    pub fn visits(&self, path: &Path) -> u64 {
        self.visits.get(path)
    }

    /// A manifest was opened in the editor
    pub async fn on_manifest_opened(&self, path: &Path) -> Option<DependencyReport> {
        info!("Manifest opened: {:?}", path);
        self.run_pass(path, false).await
    }

    /// A manifest changed on disk
    pub async fn on_manifest_changed(&self, path: &Path) -> Option<DependencyReport> {
        info!("Manifest changed: {:?}", path);
        self.run_pass(path, false).await
    }

    /// Periodic refresh: refetch everything in the watched manifest, if it exists
    pub async fn on_tick(&self) -> Option<DependencyReport> {
        let Some(path) = &self.watched_manifest else {
            debug!("No watched manifest, skipping periodic refresh");
            return None;
        };

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            debug!("Watched manifest {:?} does not exist, skipping", path);
            return None;
        }

        info!("Periodic refresh of {:?}", path);
        self.run_pass(path, true).await
    }

    async fn run_pass(&self, path: &Path, force_refresh: bool) -> Option<DependencyReport> {
        let (report, visits) = self.resolve_and_render(path, force_refresh).await?;

        if !force_refresh && visits == 1 {
            self.schedule_follow_up(path);
        }

        Some(report)
    }

    fn schedule_follow_up(&self, path: &Path) -> JoinHandle<()> {
        debug!(
            "First pass for {:?}, forcing a refresh in {:?}",
            path, self.follow_up_delay
        );

        let this = self.clone();
        let path = path.to_path_buf();
        tokio::spawn(async move {
            sleep(this.follow_up_delay).await;
            this.resolve_and_render(&path, true).await;
        })
    }

    /// One resolution pass: load, resolve, render once.
    ///
    /// Returns the report and the visit count, or `None` when the manifest
    /// could not be loaded (nothing is rendered then). A pass superseded by a
    /// newer one for the same path keeps its cache writes but does not render.
    async fn resolve_and_render(
        &self,
        path: &Path,
        force_refresh: bool,
    ) -> Option<(DependencyReport, u64)> {
        let generation = self.generations.begin(path);
        let manifest = self
            .manifests
            .load(path)
            .await
            .inspect_err(|e| debug!("Skipping {:?}: {}", path, e))
            .ok()?;

        let visits = self.visits.record(path);
        let dependencies = manifest.merged_dependencies();

        let report =
            resolve_dependencies(&dependencies, &*self.store, &*self.registry, force_refresh).await;

        let locations = locate_dependencies(&manifest.text)
            .inspect_err(|e| warn!("Failed to locate dependencies in {:?}: {}", path, e))
            .unwrap_or_default();

        if !self.generations.is_current(path, generation) {
            debug!(
                "Pass {} for {:?} superseded by a newer pass, not rendering",
                generation, path
            );
            return Some((report, visits));
        }

        let annotations = build_annotations(&report, &locations);
        debug!(
            "Rendering {} annotations for {:?} (pass {}, force_refresh: {})",
            annotations.len(),
            path,
            visits,
            force_refresh
        );
        self.surface.replace_annotations(path, annotations).await;

        Some((report, visits))
    }
}

/// Run [`RefreshCoordinator::on_tick`] every `interval`, first tick one interval from now.
///
/// Returns `None` (no task) for a zero interval.
pub fn spawn_periodic_refresh<S: VersionStore>(
    coordinator: RefreshCoordinator<S>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        warn!("Refresh interval is zero, periodic refresh disabled");
        return None;
    }

    info!("Periodic refresh every {:?}", interval);
    Some(tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            coordinator.on_tick().await;
        }
    }))
}
