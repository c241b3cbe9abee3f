//! # Canvas Embed Configuration
//!
//! Settings for export, embed rendering, placeholder watching and logging.
//!
//! ```rust,no_run
//! use canvas_embed_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load_from_file("canvas-embed.toml").await?;
//!     println!("separator: {:?}", config.export.separator);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod loader;

pub use config::*;
pub use loader::*;
