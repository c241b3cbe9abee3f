//! canvas-embed CLI library
//!
//! Argument parsing, the terminal stand-ins for the host application
//! (workspace and clipboard), and one module per subcommand.

pub mod cli;
pub mod commands;
pub mod host;
