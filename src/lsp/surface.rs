//! Annotations rendered as inlay hints

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tower_lsp::Client;
use tower_lsp::lsp_types::request::InlayHintRefreshRequest;
use tower_lsp::lsp_types::*;
use tracing::{debug, warn};

use crate::annotation::{Annotation, AnnotationSurface};
use crate::manifest::TextPosition;

/// Holds the latest annotations per open manifest and serves them as inlay hints.
///
/// Renders for documents that are not open are dropped.
pub struct LspSurface {
    client: Client,
    open_documents: Mutex<HashSet<PathBuf>>,
    annotations: Mutex<HashMap<PathBuf, Vec<Annotation>>>,
    refresh_support: AtomicBool,
}

impl LspSurface {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            open_documents: Mutex::new(HashSet::new()),
            annotations: Mutex::new(HashMap::new()),
            refresh_support: AtomicBool::new(false),
        }
    }

    /// Whether the client accepts `workspace/inlayHint/refresh`
    pub fn set_refresh_support(&self, supported: bool) {
        self.refresh_support.store(supported, Ordering::Relaxed);
    }

    pub fn open(&self, path: &Path) {
        self.open_documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf());
    }

    pub fn close(&self, path: &Path) {
        self.open_documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.open_documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
    }

    /// Inlay hints for the annotations currently shown in `path`
    pub fn inlay_hints(&self, path: &Path) -> Vec<InlayHint> {
        let annotations = self.annotations.lock().unwrap_or_else(|e| e.into_inner());
        annotations
            .get(path)
            .map(|annotations| annotations.iter().map(to_inlay_hint).collect())
            .unwrap_or_default()
    }

    fn spawn_inlay_hint_refresh(&self) {
        let client = self.client.clone();
        tokio::spawn(async move {
            client
                .send_request::<InlayHintRefreshRequest>(())
                .await
                .inspect_err(|e| warn!("Inlay hint refresh failed: {}", e))
                .ok();
        });
    }
}

fn to_position(position: TextPosition) -> Position {
    Position::new(position.line, position.character)
}

/// Hint placed after the dependency entry, carrying kind and colour for clients that style hints
fn to_inlay_hint(annotation: &Annotation) -> InlayHint {
    InlayHint {
        position: to_position(annotation.range.end),
        label: InlayHintLabel::String(annotation.label.clone()),
        kind: None,
        text_edits: None,
        tooltip: Some(InlayHintTooltip::String(annotation.hover_text.clone())),
        padding_left: Some(true),
        padding_right: None,
        data: Some(json!({
            "kind": annotation.kind,
            "color": annotation.color,
        })),
    }
}

fn display_uri(path: &Path) -> String {
    Url::from_file_path(path)
        .map(|uri| uri.to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

#[async_trait]
impl AnnotationSurface for LspSurface {
    async fn replace_annotations(&self, path: &Path, annotations: Vec<Annotation>) {
        if !self.is_open(path) {
            debug!("{:?} is not open, dropping {} annotations", path, annotations.len());
            return;
        }

        let count = annotations.len();
        self.annotations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), annotations);

        self.client
            .log_message(
                MessageType::INFO,
                format!("Annotated {} dependencies in {}", count, display_uri(path)),
            )
            .await;

        if self.refresh_support.load(Ordering::Relaxed) {
            self.spawn_inlay_hint_refresh();
        }
    }
}
