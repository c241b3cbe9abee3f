use async_trait::async_trait;

use crate::error::Result;

/// System clipboard, write-only.
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents. Failures map to `EmbedError::Clipboard`.
    async fn write_text(&self, text: &str) -> Result<()>;
}
