use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tokio::task::JoinHandle;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

use crate::config::{LspConfig, MANIFEST_FILE_NAME, data_dir, db_path};
use crate::lsp::surface::LspSurface;
use crate::manifest::FileManifestSource;
use crate::refresh::{RefreshCoordinator, spawn_periodic_refresh};
use crate::version::cache::{Cache, VersionStore};
use crate::version::registries::npm::NpmRegistry;
use crate::version::registry::Registry;

const WATCHER_REGISTRATION_ID: &str = "version-lens-manifest-watcher";

pub struct Backend<S: VersionStore> {
    client: Client,
    store: Option<Arc<S>>,
    /// Overrides the registry built from configuration
    registry: Option<Arc<dyn Registry>>,
    surface: Arc<LspSurface>,
    config: OnceLock<LspConfig>,
    coordinator: OnceLock<RefreshCoordinator<S>>,
    dynamic_watch_support: AtomicBool,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Backend<Cache> {
    pub fn new(client: Client) -> Self {
        let store = Self::initialize_store();
        Self::with_parts(client, store, None)
    }

    fn initialize_store() -> Option<Arc<Cache>> {
        let data_dir = data_dir();
        let db_path = db_path();

        // Create data directory if it doesn't exist
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            error!("Failed to create data directory {:?}: {}", data_dir, e);
            return None;
        }

        match Cache::new(&db_path) {
            Ok(cache) => {
                info!("Cache initialized at {:?}", db_path);
                Some(Arc::new(cache))
            }
            Err(e) => {
                error!("Failed to initialize cache: {}", e);
                None
            }
        }
    }
}

impl<S: VersionStore> Backend<S> {
    /// Build a Backend with a custom store and registry
    pub fn build(client: Client, store: Arc<S>, registry: Arc<dyn Registry>) -> Self {
        Self::with_parts(client, Some(store), Some(registry))
    }

    fn with_parts(
        client: Client,
        store: Option<Arc<S>>,
        registry: Option<Arc<dyn Registry>>,
    ) -> Self {
        Self {
            surface: Arc::new(LspSurface::new(client.clone())),
            client,
            store,
            registry,
            config: OnceLock::new(),
            coordinator: OnceLock::new(),
            dynamic_watch_support: AtomicBool::new(false),
            refresh_task: Mutex::new(None),
        }
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                    ..Default::default()
                },
            )),
            inlay_hint_provider: Some(OneOf::Left(true)),
            ..Default::default()
        }
    }

    fn parse_config(options: Option<serde_json::Value>) -> LspConfig {
        options
            .map(serde_json::from_value::<LspConfig>)
            .transpose()
            .inspect_err(|e| warn!("Invalid initialization options, using defaults: {}", e))
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// `<workspace root>/package.json`, if the client sent a file root
    #[allow(deprecated)]
    fn watched_manifest(params: &InitializeParams) -> Option<PathBuf> {
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| &folder.uri)
            .or(params.root_uri.as_ref())?;

        root.to_file_path()
            .ok()
            .map(|root| root.join(MANIFEST_FILE_NAME))
    }

    fn create_coordinator(
        &self,
        config: &LspConfig,
        watched_manifest: Option<PathBuf>,
    ) -> Option<RefreshCoordinator<S>> {
        let Some(store) = self.store.clone() else {
            warn!("Cache not available, dependencies will not be annotated");
            return None;
        };

        let registry = self
            .registry
            .clone()
            .unwrap_or_else(|| Arc::new(NpmRegistry::new(&config.registry.url)));

        let coordinator = RefreshCoordinator::new(
            store,
            registry,
            Arc::new(FileManifestSource),
            self.surface.clone(),
        )
        .with_follow_up_delay(config.refresh.follow_up_delay());

        Some(match watched_manifest {
            Some(path) => coordinator.with_watched_manifest(path),
            None => coordinator,
        })
    }

    fn register_manifest_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String(format!("**/{}", MANIFEST_FILE_NAME)),
                kind: None,
            }],
        };
        let register_options = match serde_json::to_value(options) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to serialize watcher options: {}", e);
                return;
            }
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            client
                .register_capability(vec![Registration {
                    id: WATCHER_REGISTRATION_ID.to_string(),
                    method: "workspace/didChangeWatchedFiles".to_string(),
                    register_options: Some(register_options),
                }])
                .await
                .inspect_err(|e| warn!("Failed to register manifest watcher: {}", e))
                .ok();
        });
    }

    fn spawn_pass(&self, path: PathBuf, opened: bool) {
        let Some(coordinator) = self.coordinator.get().cloned() else {
            debug!("No coordinator, skipping {:?}", path);
            return;
        };

        tokio::spawn(async move {
            if opened {
                coordinator.on_manifest_opened(&path).await;
            } else {
                coordinator.on_manifest_changed(&path).await;
            }
        });
    }
}

/// File path of `uri` if it names a manifest
fn manifest_path(uri: &Url) -> Option<PathBuf> {
    let path = uri.to_file_path().ok()?;
    is_manifest(&path).then_some(path)
}

fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name == MANIFEST_FILE_NAME)
}

#[tower_lsp::async_trait]
impl<S: VersionStore> LanguageServer for Backend<S> {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.client
            .log_message(MessageType::INFO, "LSP server initializing")
            .await;

        let config = Self::parse_config(params.initialization_options.clone());
        info!("Configuration: {:?}", config);

        let workspace = params.capabilities.workspace.as_ref();
        let refresh_support = workspace
            .and_then(|w| w.inlay_hint.as_ref())
            .and_then(|hints| hints.refresh_support)
            .unwrap_or(false);
        let dynamic_watch_support = workspace
            .and_then(|w| w.did_change_watched_files.as_ref())
            .and_then(|watch| watch.dynamic_registration)
            .unwrap_or(false);
        self.surface.set_refresh_support(refresh_support);
        self.dynamic_watch_support
            .store(dynamic_watch_support, Ordering::Relaxed);

        if let Some(coordinator) = self.create_coordinator(&config, Self::watched_manifest(&params))
        {
            let _ = self.coordinator.set(coordinator);
        }
        let _ = self.config.set(config);

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "version-lens".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "LSP server initialized")
            .await;

        if self.dynamic_watch_support.load(Ordering::Relaxed) {
            self.register_manifest_watcher();
        }

        let Some(coordinator) = self.coordinator.get().cloned() else {
            return;
        };
        let interval = self
            .config
            .get()
            .map(|config| config.refresh.interval())
            .unwrap_or_default();
        let handle = spawn_periodic_refresh(coordinator, interval);
        *self.refresh_task.lock().unwrap_or_else(|e| e.into_inner()) = handle;
    }

    async fn shutdown(&self) -> Result<()> {
        self.client
            .log_message(MessageType::INFO, "LSP server shutting down")
            .await;
        if let Some(handle) = self
            .refresh_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(path) = manifest_path(&params.text_document.uri) else {
            return;
        };

        self.client
            .log_message(
                MessageType::LOG,
                format!("Document opened: {}", params.text_document.uri),
            )
            .await;

        self.surface.open(&path);
        self.spawn_pass(path, true);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Some(path) = manifest_path(&params.text_document.uri) else {
            return;
        };

        debug!("Document saved: {}", params.text_document.uri);
        self.spawn_pass(path, false);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let Some(path) = manifest_path(&params.text_document.uri) else {
            return;
        };

        debug!("Document closed: {}", params.text_document.uri);
        self.surface.close(&path);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            if change.typ != FileChangeType::CHANGED && change.typ != FileChangeType::CREATED {
                continue;
            }
            if let Some(path) = manifest_path(&change.uri) {
                self.spawn_pass(path, false);
            }
        }
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        let Some(path) = manifest_path(&params.text_document.uri) else {
            return Ok(None);
        };

        let hints = self.surface.inlay_hints(&path);
        debug!("Returning {} inlay hints for {:?}", hints.len(), path);
        Ok(Some(hints))
    }
}
