//! # Canvas Embed Core
//!
//! Domain types and the pure parts of the canvas embed pipeline:
//!
//! - [`canvas`] - canvas documents and nodes as stored in `.canvas` JSON
//! - [`reference`] - parsing of `<path>.canvas#<node-id>` embed references
//! - [`store`] - the document store abstraction plus in-memory and kiln backends
//! - [`loader`] - fetch + decode of canvas documents and node lookup
//! - [`export`] - canvas nodes to markdown embed lines and collision-free naming
//! - [`host`], [`clipboard`] - contracts for the surrounding application
//! - [`commands`] - the user-facing command surface and applicability checks
//!
//! Rendering lives in `canvas-embed-render`, the live placeholder observer in
//! `canvas-embed-watch`.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod canvas;
pub mod clipboard;
pub mod commands;
pub mod error;
pub mod export;
pub mod host;
pub mod loader;
pub mod reference;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use canvas::{CanvasDocument, CanvasNode, NodeKind};
pub use clipboard::Clipboard;
pub use commands::{CommandContext, DocumentKind, EmbedCommand};
pub use error::{EmbedError, Result};
pub use export::{embed_link, next_available_path, nodes_to_markdown, Exporter};
pub use host::Workspace;
pub use loader::CanvasLoader;
pub use reference::NodeReference;
pub use store::{DocumentStore, InMemoryStore, KilnStore};

/// File extension of canvas documents (without the dot).
pub const CANVAS_EXTENSION: &str = "canvas";

/// File extension of markdown documents (without the dot).
pub const MARKDOWN_EXTENSION: &str = "md";
