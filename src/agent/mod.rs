//! Conversational agent for docqa.
//!
//! A model handle, an ordered list of capabilities and a system prompt,
//! driven by a synchronous reasoning-acting loop.
//!
//! # Architecture
//!
//! ```text
//! AgentComposer::create_agent
//!   ├── DocumentRetriever::get_tool      (always)
//!   ├── McpBridge::get_callables         (when remote tools are requested)
//!   ├── PromptVariant::for_tools         (document-only or remote-tools)
//!   └── QaAgent
//!         └── invoke(history, question)
//!               └── agentic_loop: model → tool calls → results → model …
//! ```

pub mod agentic_loop;
pub mod client;
pub mod composer;
pub mod executor;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod qa_agent;
pub mod tool;

// Re-export key types
pub use agentic_loop::LoopOutcome;
pub use client::{ProviderFactory, create_provider, openai_factory, shared_factory};
pub use composer::AgentComposer;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use prompt::{PromptSet, PromptVariant};
pub use provider::LlmProvider;
pub use qa_agent::{AgentReply, QaAgent};
pub use tool::{Capability, CapabilitySource, ToolCall, ToolDefinition, ToolResult, ToolSet};
