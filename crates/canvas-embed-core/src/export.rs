//! Canvas to markdown export
//!
//! Each canvas node becomes one embed line:
//!
//! | node type | line |
//! |-----------|------|
//! | `file` | `![[<file>]]` |
//! | `text` | `![[<canvas-name>#<node-id>]]` |
//! | anything else | empty |
//!
//! Lines are joined in canvas order. New documents are named after the canvas
//! (`board.canvas` -> `board.md`) with ` (n)` appended until the name is free.

use std::sync::Arc;

use tracing::{error, info};

use crate::canvas::{CanvasNode, NodeKind};
use crate::clipboard::Clipboard;
use crate::error::{EmbedError, Result};
use crate::host::Workspace;
use crate::store::{file_name, DocumentStore};
use crate::{CANVAS_EXTENSION, MARKDOWN_EXTENSION};

/// Separator placed between exported embed lines.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Embed syntax for a single node. `source_name` is the file name of the
/// canvas the node belongs to.
pub fn embed_link(node: &CanvasNode, source_name: &str) -> String {
    match node.kind() {
        NodeKind::File => format!("![[{}]]", node.file.as_deref().unwrap_or_default()),
        NodeKind::Text => format!("![[{}#{}]]", source_name, node.id),
        NodeKind::Other(_) => String::new(),
    }
}

/// Embed lines for `nodes`, in order, joined by `separator`.
pub fn nodes_to_markdown(nodes: &[CanvasNode], source_name: &str, separator: &str) -> String {
    nodes
        .iter()
        .map(|node| embed_link(node, source_name))
        .collect::<Vec<_>>()
        .join(separator)
}

/// Link copied from a node's context menu. File cards link the file itself,
/// everything else links the card inside the active canvas.
pub fn node_link(node: &CanvasNode, active_name: &str) -> String {
    match node.file.as_deref() {
        Some(file) => format!("![[{file}]]"),
        None => format!("![[{}#{}]]", active_name, node.id),
    }
}

/// Canvas path without its `.canvas` extension.
pub fn export_base_path(canvas_path: &str) -> &str {
    canvas_path
        .strip_suffix(&format!(".{CANVAS_EXTENSION}"))
        .unwrap_or(canvas_path)
}

/// First of `base.md`, `base (1).md`, `base (2).md`, ... not present in `store`.
///
/// Existence is checked, not reserved: a writer racing between this call and
/// the create can still take the name.
pub async fn next_available_path(store: &dyn DocumentStore, base: &str) -> String {
    let mut candidate = format!("{base}.{MARKDOWN_EXTENSION}");
    let mut counter = 1u32;
    while store.exists(&candidate).await {
        candidate = format!("{base} ({counter}).{MARKDOWN_EXTENSION}");
        counter += 1;
    }
    candidate
}

/// Runs the user-initiated export actions against a store and workspace.
///
/// Unlike embed resolution, failures here are never swallowed: the user is
/// notified and the error is returned.
pub struct Exporter {
    store: Arc<dyn DocumentStore>,
    workspace: Arc<dyn Workspace>,
    separator: String,
}

impl Exporter {
    pub fn new(store: Arc<dyn DocumentStore>, workspace: Arc<dyn Workspace>) -> Self {
        Self {
            store,
            workspace,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Write `nodes` of the canvas at `canvas_path` to a new markdown
    /// document next to it, open it, and return its path.
    pub async fn export_to_new(&self, nodes: &[CanvasNode], canvas_path: &str) -> Result<String> {
        let content = nodes_to_markdown(nodes, file_name(canvas_path), &self.separator);
        let target = next_available_path(self.store.as_ref(), export_base_path(canvas_path)).await;

        if let Err(e) = self.store.create(&target, &content).await {
            error!(path = %target, error = %e, "Failed to create export document");
            self.workspace
                .notify(&format!("Failed to create {}", file_name(&target)));
            return Err(e);
        }

        info!(canvas = canvas_path, path = %target, nodes = nodes.len(), "Exported canvas");
        self.workspace.open(&target).await?;
        Ok(target)
    }

    /// Append `nodes` of the canvas at `canvas_path` to an existing markdown
    /// document. The block starts with a separator so it never runs into the
    /// document's last line.
    pub async fn append_to(
        &self,
        nodes: &[CanvasNode],
        canvas_path: &str,
        target: &str,
    ) -> Result<()> {
        let body = nodes_to_markdown(nodes, file_name(canvas_path), &self.separator);
        let content = format!("{}{}", self.separator, body);

        if let Err(e) = self.store.append(target, &content).await {
            error!(path = target, error = %e, "Failed to append export");
            self.workspace
                .notify(&format!("Failed to append to {}", file_name(target)));
            return Err(match e {
                EmbedError::NotFound(_) => e,
                other => EmbedError::store_write(target, other),
            });
        }

        info!(canvas = canvas_path, path = target, nodes = nodes.len(), "Appended canvas");
        self.workspace
            .notify(&format!("Selection appended to {}", file_name(target)));
        self.workspace.open(target).await?;
        Ok(())
    }

    /// Copy the embed link of `node` (a card of the active canvas) to the
    /// clipboard and return it.
    pub async fn copy_node_link(
        &self,
        node: &CanvasNode,
        clipboard: &dyn Clipboard,
    ) -> Result<String> {
        let active = self
            .workspace
            .active_document()
            .ok_or_else(|| EmbedError::not_found("active canvas"))?;
        let link = node_link(node, file_name(&active));

        match clipboard.write_text(&link).await {
            Ok(()) => {
                self.workspace.notify("Node link copied to clipboard!");
                Ok(link)
            }
            Err(e) => {
                error!(error = %e, "Failed to copy to clipboard");
                self.workspace
                    .notify("Failed to copy node link to clipboard.");
                Err(match e {
                    EmbedError::Clipboard(_) => e,
                    other => EmbedError::Clipboard(other.to_string()),
                })
            }
        }
    }
}
