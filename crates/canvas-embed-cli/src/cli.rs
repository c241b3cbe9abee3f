use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages (default for --verbose)
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "canvas-embed")]
#[command(about = "canvas-embed - embed canvas nodes in markdown notes and export canvases to markdown")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Kiln directory that canvas and note paths are relative to
    #[arg(short = 'k', long, global = true, default_value = ".")]
    pub kiln: PathBuf,

    /// Set log level (off, error, warn, info, debug, trace)
    /// If not specified, uses config file value or defaults to 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/canvas-embed/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export canvas nodes to a new markdown file next to the canvas
    ///
    /// Without --node the whole canvas is exported. Prints the created path.
    Export {
        /// Canvas document (kiln-relative or absolute)
        canvas: String,

        /// Only export these node ids (can be repeated, canvas order is kept)
        #[arg(short = 'n', long = "node", value_name = "ID")]
        nodes: Vec<String>,
    },

    /// Append canvas nodes to an existing markdown file
    Append {
        /// Canvas document (kiln-relative or absolute)
        canvas: String,

        /// Markdown document to append to
        target: String,

        /// Only append these node ids (can be repeated, canvas order is kept)
        #[arg(short = 'n', long = "node", value_name = "ID")]
        nodes: Vec<String>,
    },

    /// Copy the embed link of a canvas node to the clipboard (OSC 52)
    ///
    /// The link is printed as well, so it can be piped.
    #[command(name = "copy-link")]
    CopyLink {
        /// Canvas document (kiln-relative or absolute)
        canvas: String,

        /// Node id inside the canvas
        node_id: String,
    },

    /// Render a markdown note to HTML with canvas node embeds resolved
    Render {
        /// Markdown note (kiln-relative or absolute)
        note: String,
    },

    /// List the commands available for a document
    Commands {
        /// Active document
        #[arg(short = 'a', long)]
        active: Option<String>,

        /// Number of selected canvas nodes
        #[arg(short = 's', long, default_value = "0")]
        selected: usize,
    },
}
