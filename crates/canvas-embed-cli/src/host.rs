//! Terminal implementations of the host contracts.

use std::io::{IsTerminal, Write};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use tracing::{debug, info};

use canvas_embed_core::{Clipboard, EmbedError, Result, Workspace};

/// Workspace for a single CLI invocation.
///
/// Notices go to stderr; "opening" a document only records and logs it since
/// there is no editor to hand it to.
#[derive(Debug, Default)]
pub struct CliWorkspace {
    active: Mutex<Option<String>>,
    opened: Mutex<Vec<String>>,
}

impl CliWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&self, path: impl Into<String>) {
        *self.active.lock() = Some(path.into());
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl Workspace for CliWorkspace {
    fn active_document(&self) -> Option<String> {
        self.active.lock().clone()
    }

    async fn open(&self, path: &str) -> Result<()> {
        info!(path, "Opening document");
        self.opened.lock().push(path.to_string());
        Ok(())
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Clipboard reached through the terminal with an OSC 52 escape sequence.
#[derive(Debug, Clone, Copy)]
pub struct TerminalClipboard {
    interactive: bool,
}

impl TerminalClipboard {
    /// Clipboard on the controlling terminal, if stderr is one.
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stderr().is_terminal(),
        }
    }

    /// `ESC ] 52 ; c ; <base64> BEL`
    pub fn osc52(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }
}

#[async_trait]
impl Clipboard for TerminalClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if !self.interactive {
            return Err(EmbedError::Clipboard("stderr is not a terminal".to_string()));
        }

        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(Self::osc52(text).as_bytes())
            .and_then(|()| stderr.flush())
            .map_err(|e| EmbedError::Clipboard(e.to_string()))?;
        debug!(bytes = text.len(), "Wrote OSC 52 clipboard sequence");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osc52_sequence() {
        assert_eq!(
            TerminalClipboard::osc52("![[a.md]]"),
            "\x1b]52;c;IVtbYS5tZF1d\x07"
        );
    }

    #[tokio::test]
    async fn test_non_terminal_clipboard_fails() {
        let clipboard = TerminalClipboard { interactive: false };
        let err = clipboard.write_text("x").await.unwrap_err();
        assert!(matches!(err, EmbedError::Clipboard(_)));
    }

    #[tokio::test]
    async fn test_workspace_records_opened_documents() {
        let workspace = CliWorkspace::new();
        assert_eq!(workspace.active_document(), None);

        workspace.set_active("board.canvas");
        workspace.open("board.md").await.unwrap();

        assert_eq!(workspace.active_document().as_deref(), Some("board.canvas"));
        assert_eq!(workspace.opened(), vec!["board.md".to_string()]);
    }
}
