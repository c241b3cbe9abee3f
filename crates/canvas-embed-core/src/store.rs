//! Document store abstraction
//!
//! The pipeline never touches the filesystem directly. Everything goes through
//! [`DocumentStore`], addressed by kiln-relative paths using `/` separators.
//!
//! - [`InMemoryStore`] - map-backed store for tests and embedding
//! - [`KilnStore`] - a directory on disk
//!
//! Link resolution follows wikilink rules: a link is first tried relative to
//! the folder of the document that contains it, then as a kiln-relative path,
//! and finally matched by path suffix anywhere in the kiln.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{EmbedError, Result};

/// Read/create/append access to the documents of a kiln.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Raw bytes of the document at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Whether a document exists at `path`.
    async fn exists(&self, path: &str) -> bool;

    /// Create a new document. Fails with `StoreWrite` if it already exists.
    async fn create(&self, path: &str, content: &str) -> Result<()>;

    /// Append to an existing document. Fails with `NotFound` if it is missing.
    async fn append(&self, path: &str, content: &str) -> Result<()>;

    /// All document paths, sorted.
    async fn list(&self) -> Result<Vec<String>>;

    /// Resolve the link target `raw` as written inside the document at `base`.
    async fn resolve_link_path(&self, raw: &str, base: &str) -> Option<String> {
        let known = self.list().await.ok()?;
        resolve_linkpath(raw, base, &known)
    }
}

/// Collapse `.` and `..` segments. Returns `None` when the path escapes the
/// kiln root.
pub fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Parent folder of a kiln-relative path (`""` for the kiln root).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// File name component of a kiln-relative path.
pub fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// Resolve `raw` (as written in the document at `base`) against `known` paths.
pub fn resolve_linkpath(raw: &str, base: &str, known: &[String]) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let contains = |candidate: &str| known.iter().any(|p| p == candidate);

    let dir = parent_dir(base);
    if !dir.is_empty() {
        if let Some(relative) = normalize_path(&format!("{dir}/{raw}")) {
            if contains(&relative) {
                trace!(raw, base, resolved = %relative, "Resolved link relative to source");
                return Some(relative);
            }
        }
    }

    let absolute = normalize_path(raw)?;
    if contains(&absolute) {
        return Some(absolute);
    }

    // Shortest path wins, ties broken alphabetically (`known` is sorted).
    let suffix = format!("/{absolute}");
    let resolved = known
        .iter()
        .filter(|p| p.ends_with(&suffix))
        .min_by_key(|p| p.len())
        .cloned();

    if resolved.is_none() {
        debug!(raw, base, "Link target not found in kiln");
    }
    resolved
}

// ============================================================================
// In-memory store
// ============================================================================

/// Map-backed [`DocumentStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    documents: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document, bypassing create/append semantics.
    pub fn insert(&self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.documents.write().insert(path.into(), content.into());
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_document(self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Content of a document as UTF-8, if present.
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.documents
            .read()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.documents
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| EmbedError::not_found(path))
    }

    async fn exists(&self, path: &str) -> bool {
        self.documents.read().contains_key(path)
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        let mut documents = self.documents.write();
        if documents.contains_key(path) {
            return Err(EmbedError::store_write(path, "document already exists"));
        }
        documents.insert(path.to_string(), content.as_bytes().to_vec());
        Ok(())
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        let mut documents = self.documents.write();
        let existing = documents
            .get_mut(path)
            .ok_or_else(|| EmbedError::not_found(path))?;
        existing.extend_from_slice(content.as_bytes());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self.documents.read().keys().cloned().collect())
    }
}

// ============================================================================
// Filesystem kiln store
// ============================================================================

/// [`DocumentStore`] over a directory on disk.
///
/// Dot-directories (`.obsidian`, `.git`, ...) are not listed.
#[derive(Debug, Clone)]
pub struct KilnStore {
    root: PathBuf,
}

impl KilnStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a kiln-relative path.
    pub fn absolute(&self, path: &str) -> Result<PathBuf> {
        let normalized = normalize_path(path)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| EmbedError::not_found(format!("{path} is outside the kiln")))?;
        Ok(self.root.join(normalized))
    }

    /// Kiln-relative form of an absolute or working-directory path.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let stripped = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = stripped
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl DocumentStore for KilnStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let absolute = self.absolute(path)?;
        tokio::fs::read(&absolute).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => EmbedError::not_found(path),
            _ => EmbedError::Io(format!("{}: {}", absolute.display(), e)),
        })
    }

    async fn exists(&self, path: &str) -> bool {
        match self.absolute(path) {
            Ok(absolute) => tokio::fs::try_exists(absolute).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        let absolute = self
            .absolute(path)
            .map_err(|e| EmbedError::store_write(path, e))?;
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EmbedError::store_write(path, e))?;
        }

        // create_new: a concurrent writer that got there first makes this fail
        // instead of being overwritten.
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&absolute)
            .await
            .map_err(|e| EmbedError::store_write(path, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| EmbedError::store_write(path, e))?;
        file.flush()
            .await
            .map_err(|e| EmbedError::store_write(path, e))?;

        debug!(path, bytes = content.len(), "Created document");
        Ok(())
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        let absolute = self.absolute(path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&absolute)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EmbedError::not_found(path),
                _ => EmbedError::store_write(path, e),
            })?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| EmbedError::store_write(path, e))?;
        file.flush()
            .await
            .map_err(|e| EmbedError::store_write(path, e))?;

        debug!(path, bytes = content.len(), "Appended to document");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.walk())
            .await
            .map_err(|e| EmbedError::Internal(format!("kiln walk panicked: {e}")))
    }
}

impl KilnStore {
    /// Every file under the root, skipping dot-entries. Unreadable entries
    /// are logged and left out.
    fn walk(&self) -> Vec<String> {
        let mut found: Vec<String> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable kiln entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| self.relative(e.path()))
            .collect();

        found.sort();
        found
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
