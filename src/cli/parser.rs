//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// docqa: ask questions about an indexed document collection.
///
/// Answers come from a language model that searches the document index and,
/// when remote tool servers are configured, can inspect files over MCP.
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute. Defaults to `chat`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive question-answering session.
    #[command(after_help = r#"Examples:
  docqa                          # Same as `docqa chat`
  docqa chat --no-remote         # Document search only
  docqa chat --model gpt-4o-mini
"#)]
    Chat {
        /// Do not connect to remote tool servers.
        #[arg(long)]
        no_remote: bool,

        /// Chat model override.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Ask one question and print the answer.
    #[command(after_help = r#"Examples:
  docqa ask "What are the risk strategies?"
  docqa --format json ask "List current directory" | jq .answer
"#)]
    Ask {
        /// The question.
        question: String,

        /// Do not connect to remote tool servers.
        #[arg(long)]
        no_remote: bool,

        /// Chat model override.
        #[arg(short, long)]
        model: Option<String>,

        /// Iteration cap override for this question.
        #[arg(long)]
        iteration_limit: Option<usize>,
    },

    /// Show configuration status and index diagnostics.
    Status,

    /// List the tools an agent would be given.
    Tools {
        /// Do not connect to remote tool servers.
        #[arg(long)]
        no_remote: bool,
    },

    /// Write the default prompt files for customization.
    InitPrompts {
        /// Target directory (default: ~/.config/docqa/prompts).
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Run the reference filesystem tool server.
    #[cfg(feature = "fs-server")]
    #[command(subcommand)]
    Mcp(McpCommands),
}

/// Filesystem tool server transports.
#[cfg(feature = "fs-server")]
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Serve over streamable HTTP at /mcp.
    #[command(after_help = r#"Examples:
  docqa mcp serve                          # Listen on 127.0.0.1:8000
  docqa mcp serve --port 8001 --root ./data
  MCP_SERVER_URLS=http://127.0.0.1:8000 docqa chat
"#)]
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Confine tools to this directory.
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Serve over stdin/stdout.
    Stdio {
        /// Confine tools to this directory.
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

impl Cli {
    /// Default log filter for the verbosity flag.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn test_no_subcommand_is_chat() {
        let cli = parse(&["docqa"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.format, "text");
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_verbosity_counts() {
        assert_eq!(parse(&["docqa", "-v", "status"]).log_level(), "info");
        assert_eq!(parse(&["docqa", "status", "-vv"]).log_level(), "debug");
    }

    #[test]
    fn test_ask_flags() {
        let cli = parse(&[
            "docqa",
            "--format",
            "json",
            "ask",
            "What now?",
            "--no-remote",
            "--iteration-limit",
            "3",
        ]);
        assert_eq!(cli.format, "json");
        match cli.command {
            Some(Commands::Ask {
                question,
                no_remote,
                model,
                iteration_limit,
            }) => {
                assert_eq!(question, "What now?");
                assert!(no_remote);
                assert!(model.is_none());
                assert_eq!(iteration_limit, Some(3));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[cfg(feature = "fs-server")]
    #[test]
    fn test_mcp_serve_defaults() {
        match parse(&["docqa", "mcp", "serve"]).command {
            Some(Commands::Mcp(McpCommands::Serve { host, port, root })) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 8000);
                assert!(root.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
