//! Contract with the application hosting the pipeline.

use async_trait::async_trait;

use crate::error::Result;

/// The surrounding editor or shell: which document is focused, how documents
/// are opened, and how the user is told about outcomes.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Kiln-relative path of the focused document.
    fn active_document(&self) -> Option<String>;

    /// Open a document for the user.
    async fn open(&self, path: &str) -> Result<()>;

    /// Show a short, user-visible notice.
    fn notify(&self, message: &str);
}
