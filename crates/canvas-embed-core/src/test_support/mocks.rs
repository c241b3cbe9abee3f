//! Mock Implementations for Testing
//!
//! In-memory, deterministic doubles for the host-facing traits. Every mock
//! records what was asked of it so tests can assert on side effects.
//!
//! ```ignore
//! use canvas_embed_core::test_support::mocks::MockWorkspace;
//! use canvas_embed_core::Workspace;
//!
//! let workspace = MockWorkspace::new(Some("boards/plan.canvas"));
//! workspace.notify("hello");
//! assert_eq!(workspace.notices(), vec!["hello".to_string()]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::clipboard::Clipboard;
use crate::error::{EmbedError, Result};
use crate::host::Workspace;
use crate::store::{DocumentStore, InMemoryStore};

// ============================================================================
// Mock Workspace
// ============================================================================

/// Workspace that records opened documents and notices.
#[derive(Debug, Default)]
pub struct MockWorkspace {
    active: Mutex<Option<String>>,
    opened: Mutex<Vec<String>>,
    notices: Mutex<Vec<String>>,
}

impl MockWorkspace {
    pub fn new(active: Option<&str>) -> Self {
        Self {
            active: Mutex::new(active.map(str::to_string)),
            ..Default::default()
        }
    }

    pub fn set_active(&self, path: Option<&str>) {
        *self.active.lock() = path.map(str::to_string);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }
}

#[async_trait]
impl Workspace for MockWorkspace {
    fn active_document(&self) -> Option<String> {
        self.active.lock().clone()
    }

    async fn open(&self, path: &str) -> Result<()> {
        self.opened.lock().push(path.to_string());
        Ok(())
    }

    fn notify(&self, message: &str) {
        self.notices.lock().push(message.to_string());
    }
}

// ============================================================================
// Mock Clipboard
// ============================================================================

/// Clipboard holding the last written text, optionally always failing.
#[derive(Debug, Default)]
pub struct MockClipboard {
    contents: Mutex<Option<String>>,
    fail: bool,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl Clipboard for MockClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.fail {
            return Err(EmbedError::Clipboard("clipboard unavailable".to_string()));
        }
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}

// ============================================================================
// Store doubles
// ============================================================================

/// Wraps an [`InMemoryStore`] and counts reads per call.
#[derive(Debug, Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(path).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.inner.exists(path).await
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        self.inner.create(path, content).await
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        self.inner.append(path, content).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.inner.list().await
    }
}

/// Empty store whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingStore;

impl FailingStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        Err(EmbedError::not_found(path))
    }

    async fn exists(&self, _path: &str) -> bool {
        false
    }

    async fn create(&self, path: &str, _content: &str) -> Result<()> {
        Err(EmbedError::store_write(path, "read-only kiln"))
    }

    async fn append(&self, path: &str, _content: &str) -> Result<()> {
        Err(EmbedError::store_write(path, "read-only kiln"))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Store whose reads of one path wait until [`GatedStore::open`] is called.
#[derive(Debug)]
pub struct GatedStore {
    inner: InMemoryStore,
    gated: String,
    gate: Arc<Notify>,
}

impl GatedStore {
    pub fn new(inner: InMemoryStore, gated: impl Into<String>) -> Self {
        Self {
            inner,
            gated: gated.into(),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Let the next waiting read of the gated path through.
    pub fn open(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        if path == self.gated {
            self.gate.notified().await;
        }
        self.inner.read(path).await
    }

    async fn exists(&self, path: &str) -> bool {
        self.inner.exists(path).await
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        self.inner.create(path, content).await
    }

    async fn append(&self, path: &str, content: &str) -> Result<()> {
        self.inner.append(path, content).await
    }

    async fn list(&self) -> Result<Vec<String>> {
        self.inner.list().await
    }
}
