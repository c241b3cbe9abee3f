//! User-facing command surface.
//!
//! Hosts register each [`EmbedCommand`] under its [`id`](EmbedCommand::id) and
//! ask [`is_applicable`](EmbedCommand::is_applicable) before showing it.

use serde::{Deserialize, Serialize};

use crate::{CANVAS_EXTENSION, MARKDOWN_EXTENSION};

/// Document type as far as command applicability is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Canvas,
    Markdown,
    Other,
}

impl DocumentKind {
    pub fn from_path(path: &str) -> Self {
        let name = crate::store::file_name(path);
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some(ext) if ext.eq_ignore_ascii_case(CANVAS_EXTENSION) => Self::Canvas,
            Some(ext) if ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION) => Self::Markdown,
            _ => Self::Other,
        }
    }
}

/// What the host knows when deciding which commands to offer.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Kiln-relative path of the focused document.
    pub active_document: Option<String>,
    /// Number of canvas nodes currently selected.
    pub selected_nodes: usize,
}

impl CommandContext {
    pub fn new(active_document: Option<String>) -> Self {
        Self {
            active_document,
            selected_nodes: 0,
        }
    }

    #[must_use]
    pub fn with_selection(mut self, selected_nodes: usize) -> Self {
        self.selected_nodes = selected_nodes;
        self
    }

    pub fn active_kind(&self) -> Option<DocumentKind> {
        self.active_document.as_deref().map(DocumentKind::from_path)
    }
}

/// Commands contributed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbedCommand {
    /// Whole canvas to a new markdown file. From a markdown document the host
    /// asks the user to pick the canvas.
    ExportCanvas,
    /// Whole canvas appended to a picked markdown file.
    AppendCanvas,
    /// Selected nodes to a new markdown file.
    ExportSelection,
    /// Selected nodes appended to a picked markdown file.
    AppendSelection,
    /// Embed link of the selected node to the clipboard.
    CopyNodeLink,
}

impl EmbedCommand {
    pub const ALL: [EmbedCommand; 5] = [
        Self::ExportCanvas,
        Self::AppendCanvas,
        Self::ExportSelection,
        Self::AppendSelection,
        Self::CopyNodeLink,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::ExportCanvas => "canvas-to-new-markdown",
            Self::AppendCanvas => "append-canvas-to-markdown",
            Self::ExportSelection => "selection-to-new-markdown",
            Self::AppendSelection => "append-selection-to-markdown",
            Self::CopyNodeLink => "copy-card-embed-link",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ExportCanvas => "Canvas to new markdown file (retains canvas file)",
            Self::AppendCanvas => "Append canvas content to markdown file (retains canvas file)",
            Self::ExportSelection => "New .md file from selection",
            Self::AppendSelection => "Append selection to .md file",
            Self::CopyNodeLink => "Copy card embed link",
        }
    }

    pub fn is_applicable(&self, ctx: &CommandContext) -> bool {
        let kind = ctx.active_kind();
        match self {
            Self::ExportCanvas => {
                matches!(kind, Some(DocumentKind::Canvas | DocumentKind::Markdown))
            }
            Self::AppendCanvas => kind == Some(DocumentKind::Canvas),
            Self::ExportSelection | Self::AppendSelection => {
                kind == Some(DocumentKind::Canvas) && ctx.selected_nodes > 0
            }
            Self::CopyNodeLink => kind == Some(DocumentKind::Canvas) && ctx.selected_nodes == 1,
        }
    }

    /// Commands to offer in `ctx`, in declaration order.
    pub fn applicable(ctx: &CommandContext) -> Vec<EmbedCommand> {
        Self::ALL
            .into_iter()
            .filter(|command| command.is_applicable(ctx))
            .collect()
    }
}
