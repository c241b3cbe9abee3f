//! Canvas document loading.
//!
//! Documents are re-read and re-decoded on every call so that edits made to a
//! canvas show up the next time an embed of it is resolved.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::canvas::{CanvasDocument, CanvasNode};
use crate::error::{EmbedError, Result};
use crate::store::DocumentStore;

/// Fetches canvas documents from a [`DocumentStore`].
#[derive(Clone)]
pub struct CanvasLoader {
    store: Arc<dyn DocumentStore>,
}

impl CanvasLoader {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Read and decode the canvas at a resolved path.
    pub async fn load(&self, path: &str) -> Result<CanvasDocument> {
        if !self.store.exists(path).await {
            return Err(EmbedError::not_found(format!("canvas {path}")));
        }

        let bytes = self.store.read(path).await?;
        serde_json::from_slice::<CanvasDocument>(&bytes).map_err(|e| {
            warn!(path, error = %e, "Canvas document is not valid JSON");
            EmbedError::Decode {
                path: path.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Load the canvas at `path` and return the node with `node_id`.
    pub async fn find_node(&self, path: &str, node_id: &str) -> Result<CanvasNode> {
        let document = self.load(path).await?;
        let node = document.find_node(node_id).cloned().ok_or_else(|| {
            EmbedError::not_found(format!("node {node_id} in {path}"))
        })?;

        debug!(path, node_id, node_type = %node.node_type, "Loaded canvas node");
        Ok(node)
    }
}
