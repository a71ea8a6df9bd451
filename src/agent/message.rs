//! Conversation types shared by the agent, the retriever and providers.
//!
//! A conversation is a plain `Vec<ChatMessage>` owned by the caller and
//! handed back after every turn. Nothing here knows about a particular SDK.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The person asking.
    User,
    /// The model.
    Assistant,
    /// Output of a capability call.
    Tool,
}

/// One conversation entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text; empty for an assistant turn that only requested tools.
    pub content: String,
    /// Capability calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call this message answers (tool messages only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Instruction prompt.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::text(Role::System, content)
    }

    /// A question from the user.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::text(Role::User, content)
    }

    /// A textual answer from the model.
    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// An assistant turn that only requests capability calls.
    #[must_use]
    pub const fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    /// The observation produced for one call.
    #[must_use]
    pub fn tool_result(call_id: &str, content: &str) -> Self {
        Self {
            tool_call_id: Some(call_id.to_string()),
            ..Self::text(Role::Tool, content)
        }
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation so far, system prompt first when present.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; `None` leaves the service default.
    pub temperature: Option<f32>,
    /// Capabilities the model may call.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    /// A request with no temperature and no tools.
    #[must_use]
    pub fn new(model: &str, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.to_string(),
            messages,
            temperature: None,
            tools: Vec::new(),
        }
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offers capabilities to the model.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub prompt_tokens: u32,
    /// Generated tokens.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// A completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text.
    pub content: String,
    /// Token accounting.
    pub usage: TokenUsage,
    /// Capability calls the model wants made, in order.
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped (`"stop"`, `"tool_calls"`, ...).
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// True when the model asked for nothing further.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}
