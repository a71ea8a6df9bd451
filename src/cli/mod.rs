//! CLI layer for docqa.
//!
//! Provides the command-line interface using clap: the interactive
//! session, one-shot questions, diagnostics and the filesystem tool server.

pub mod commands;
pub mod output;
pub mod parser;
pub mod repl;

pub use commands::execute;
pub use output::OutputFormat;
#[cfg(feature = "fs-server")]
pub use parser::McpCommands;
pub use parser::{Cli, Commands};
