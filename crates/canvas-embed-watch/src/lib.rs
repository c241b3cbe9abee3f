//! # Canvas Embed Watching
//!
//! Live resolution of canvas node embeds. An [`EmbedObserver`] subscribes to
//! insertions in a document tree, finds placeholders such as
//!
//! ```text
//! <span class="internal-embed" src="boards/plan.canvas#3f2a9c"></span>
//! ```
//!
//! and replaces their content with the rendered canvas node:
//!
//! ```text
//! DocumentTree ──MutationBatch──▶ EmbedObserver ──find_node──▶ CanvasLoader
//!      ▲                               │
//!      │                               ▼ render
//!      └───────── install ─────── EmbedBuilder
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod mutation;
mod observer;
pub mod state;

pub use mutation::{MutationSource, Subscription};
pub use observer::{EmbedObserver, ResolutionOutcome, NODE_EMBED_ATTR};
pub use state::{PlaceholderRegistry, PlaceholderState};
