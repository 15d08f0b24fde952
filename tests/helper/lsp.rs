//! LSP request/notification test utilities

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tower_lsp::ClientSocket;
use tower_lsp::jsonrpc::{Request, Response};
use tower_lsp::lsp_types::*;

/// Create an LSP initialize request with default client capabilities
pub fn create_initialize_request(id: i64) -> Request {
    create_initialize_request_with_params(id, InitializeParams::default())
}

/// Create an LSP initialize request with the given params
pub fn create_initialize_request_with_params(id: i64, params: InitializeParams) -> Request {
    Request::build("initialize")
        .id(id)
        .params(serde_json::to_value(params).unwrap())
        .finish()
}

/// Create an LSP initialized notification
pub fn create_initialized_notification() -> Request {
    Request::build("initialized")
        .params(serde_json::to_value(InitializedParams {}).unwrap())
        .finish()
}

/// Create an LSP didOpen notification
pub fn create_did_open_notification(uri: &Url, content: &str) -> Request {
    Request::build("textDocument/didOpen")
        .params(
            serde_json::to_value(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: "json".to_string(),
                    version: 1,
                    text: content.to_string(),
                },
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP didSave notification
#[allow(dead_code)]
pub fn create_did_save_notification(uri: &Url) -> Request {
    Request::build("textDocument/didSave")
        .params(
            serde_json::to_value(DidSaveTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                text: None,
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP didClose notification
#[allow(dead_code)]
pub fn create_did_close_notification(uri: &Url) -> Request {
    Request::build("textDocument/didClose")
        .params(
            serde_json::to_value(DidCloseTextDocumentParams {
                text_document: TextDocumentIdentifier { uri: uri.clone() },
            })
            .unwrap(),
        )
        .finish()
}

/// Create an LSP inlayHint request covering the whole document
pub fn create_inlay_hint_request(id: i64, uri: &Url) -> Request {
    Request::build("textDocument/inlayHint")
        .id(id)
        .params(
            serde_json::to_value(InlayHintParams {
                work_done_progress_params: Default::default(),
                text_document: TextDocumentIdentifier { uri: uri.clone() },
                range: Range {
                    start: Position::new(0, 0),
                    end: Position::new(u32::MAX, 0),
                },
            })
            .unwrap(),
        )
        .finish()
}

/// Decode the inlay hints carried by an inlayHint response
pub fn parse_inlay_hints(response: Response) -> Option<Vec<InlayHint>> {
    let (_, result) = response.into_parts();
    serde_json::from_value(result.unwrap()).unwrap()
}

/// Label text of an inlay hint
pub fn hint_label(hint: &InlayHint) -> &str {
    match &hint.label {
        InlayHintLabel::String(label) => label,
        InlayHintLabel::LabelParts(_) => panic!("Expected a plain label"),
    }
}

/// Collect notifications in background and return a receiver
pub fn spawn_notification_collector(mut socket: ClientSocket) -> mpsc::Receiver<Request> {
    let (tx, rx) = mpsc::channel(100);

    tokio::spawn(async move {
        while let Some(notification) = socket.next().await {
            if tx.send(notification).await.is_err() {
                break;
            }
        }
    });

    rx
}

/// Wait for a `window/logMessage` whose text starts with `prefix`, returning the text
pub async fn wait_for_log_message(
    rx: &mut mpsc::Receiver<Request>,
    prefix: &str,
) -> Option<String> {
    let timeout_duration = Duration::from_secs(5);

    loop {
        match timeout(timeout_duration, rx.recv()).await {
            Ok(Some(notification)) => {
                if notification.method() != "window/logMessage" {
                    continue;
                }
                let params: LogMessageParams =
                    serde_json::from_value(notification.params().unwrap().clone()).unwrap();
                if params.message.starts_with(prefix) {
                    return Some(params.message);
                }
            }
            _ => return None,
        }
    }
}
