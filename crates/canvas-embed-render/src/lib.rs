//! # Canvas Embed Rendering
//!
//! - [`tree`] - an arena document tree with mutation notifications and
//!   event dispatch, standing in for the host's live DOM
//! - [`renderer`] - the rich-text rendering contract and a markdown
//!   implementation
//! - [`builder`] - the visual structure that replaces a canvas node embed

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod builder;
pub mod renderer;
pub mod tree;

pub use builder::{EmbedBuilder, LinkIconOptions, RenderedEmbed};
pub use renderer::{MarkdownRenderer, RichTextRenderer};
pub use tree::{
    DispatchOutcome, DocumentTree, Element, ElementId, EventKind, HostAction, Listener,
    ListenerAction, MutationBatch, MutationOptions, Node, Selector, SharedTree,
};
