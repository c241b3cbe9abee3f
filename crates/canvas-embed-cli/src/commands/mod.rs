//! Subcommand implementations.

pub mod append;
pub mod copy_link;
pub mod export;
pub mod list;
pub mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use canvas_embed_config::EmbedConfig;
use canvas_embed_core::store::normalize_path;
use canvas_embed_core::{CanvasLoader, CanvasNode, DocumentStore, Exporter, KilnStore};

use crate::host::CliWorkspace;

/// Everything a subcommand needs: the kiln, the host stand-in and settings.
pub struct CliContext {
    pub config: EmbedConfig,
    pub store: Arc<KilnStore>,
    pub workspace: Arc<CliWorkspace>,
}

impl CliContext {
    pub fn new(kiln: &Path, config: EmbedConfig) -> Result<Self> {
        let root = std::fs::canonicalize(kiln)
            .with_context(|| format!("Kiln directory '{}' does not exist", kiln.display()))?;
        if !root.is_dir() {
            bail!("Kiln path '{}' is not a directory", root.display());
        }
        debug!(kiln = %root.display(), "Using kiln");

        Ok(Self {
            config,
            store: Arc::new(KilnStore::new(root)),
            workspace: Arc::new(CliWorkspace::new()),
        })
    }

    pub fn loader(&self) -> CanvasLoader {
        CanvasLoader::new(self.store.clone())
    }

    pub fn exporter(&self) -> Exporter {
        Exporter::new(self.store.clone(), self.workspace.clone())
            .with_separator(self.config.export.separator.clone())
    }

    /// Kiln-relative form of a path given on the command line. Absolute
    /// paths must point inside the kiln.
    pub fn kiln_path(&self, arg: &str) -> Result<String> {
        let path = PathBuf::from(arg);
        if path.is_absolute() {
            let canonical = std::fs::canonicalize(&path)
                .with_context(|| format!("'{arg}' does not exist"))?;
            return self
                .store
                .relative(&canonical)
                .ok_or_else(|| anyhow!("'{arg}' is outside the kiln {}", self.store.root().display()));
        }

        normalize_path(arg)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| anyhow!("'{arg}' is outside the kiln"))
    }

    /// Nodes of the canvas at `canvas_path`: all of them, or only `ids`
    /// (canvas order). Unknown ids are an error.
    pub async fn select_nodes(&self, canvas_path: &str, ids: &[String]) -> Result<Vec<CanvasNode>> {
        let document = self
            .loader()
            .load(canvas_path)
            .await
            .with_context(|| format!("Failed to load canvas '{canvas_path}'"))?;

        if ids.is_empty() {
            return Ok(document.nodes);
        }

        if let Some(missing) = ids.iter().find(|id| document.find_node(id).is_none()) {
            bail!("Node '{missing}' not found in '{canvas_path}'");
        }
        Ok(document.select(ids))
    }

    /// Read a document as UTF-8 text.
    pub async fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self
            .store
            .read(path)
            .await
            .with_context(|| format!("Failed to read '{path}'"))?;
        String::from_utf8(bytes).with_context(|| format!("'{path}' is not valid UTF-8"))
    }
}
