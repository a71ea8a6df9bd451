//! # docqa
//!
//! Document question-answering over a local vector index, with optional
//! filesystem tools bridged in from remote MCP servers.
//!
//! A [`agent::QaAgent`] always has the `document_search` capability, backed
//! by [`retriever::DocumentRetriever`]. When remote endpoints are configured
//! and one is reachable, [`mcp::McpBridge`] adds `list_directory`,
//! `read_file`, `search_files` and `get_file_info`. Everything above the
//! network layer is synchronous; async work runs on one shared
//! [`runtime::BlockingRuntime`].
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docqa::agent::{AgentComposer, PromptSet, openai_factory};
//! use docqa::config::ConfigProvider;
//! use docqa::mcp::McpBridge;
//! use docqa::retriever::DocumentRetriever;
//! use docqa::runtime::BlockingRuntime;
//!
//! # fn main() -> docqa::Result<()> {
//! let config = ConfigProvider::from_env();
//! let settings = config.get_config();
//! let runtime = Arc::new(BlockingRuntime::new()?);
//! let prompts = PromptSet::load(config.prompt_dir());
//! let retriever = Arc::new(DocumentRetriever::new(
//!     settings,
//!     &prompts.answer_template,
//!     Arc::clone(&runtime),
//! ));
//! let bridge = Arc::new(McpBridge::from_settings(settings, Arc::clone(&runtime)));
//! let composer = AgentComposer::new(
//!     settings.agent_behavior(),
//!     retriever,
//!     bridge,
//!     openai_factory(settings),
//!     prompts,
//!     runtime,
//! );
//!
//! let agent = composer.create_agent(true, None)?;
//! let reply = agent.invoke(&[], "What are the risk strategies?", None)?;
//! if let Some(answer) = reply.answer {
//!     println!("{answer}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod mcp;
pub mod retriever;
pub mod runtime;
pub mod spinner;

pub use error::{Error, Result};
