//! The composed question-answering agent.
//!
//! A [`QaAgent`] binds one model handle, a fixed [`ToolSet`] and a system
//! prompt. It keeps no conversation state: the caller passes the history in
//! and gets the extended history back.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::agentic_loop::{LoopOutcome, agentic_loop};
use super::executor::ToolExecutor;
use super::message::{ChatMessage, ChatRequest, Role};
use super::prompt::PromptVariant;
use super::provider::LlmProvider;
use super::tool::ToolSet;
use crate::error::AgentError;
use crate::runtime::BlockingRuntime;

/// Result of one agent turn.
#[derive(Debug, Clone, Serialize)]
pub struct AgentReply {
    /// Conversation after this turn, without the system prompt. When an
    /// answer was produced it is the last message.
    pub messages: Vec<ChatMessage>,
    /// Final answer; `None` when the model gave none within the cap.
    pub answer: Option<String>,
    /// Tools called during this turn, in call order.
    pub tools_used: Vec<String>,
}

impl AgentReply {
    /// Whether the turn ended without an answer.
    #[must_use]
    pub const fn is_unanswered(&self) -> bool {
        self.answer.is_none()
    }
}

/// A model bound to a tool set and system prompt.
pub struct QaAgent {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
    tools: ToolSet,
    system_prompt: String,
    variant: PromptVariant,
    iteration_limit: usize,
    runtime: Arc<BlockingRuntime>,
}

impl QaAgent {
    /// Binds the parts of an agent together.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: &str,
        temperature: f32,
        tools: ToolSet,
        system_prompt: &str,
        variant: PromptVariant,
        iteration_limit: usize,
        runtime: Arc<BlockingRuntime>,
    ) -> Self {
        Self {
            provider,
            model: model.to_string(),
            temperature,
            tools,
            system_prompt: system_prompt.to_string(),
            variant,
            iteration_limit,
            runtime,
        }
    }

    /// Model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Bound tools, in the order the model sees them.
    #[must_use]
    pub const fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Which prompt variant was selected.
    #[must_use]
    pub const fn variant(&self) -> PromptVariant {
        self.variant
    }

    /// System prompt text.
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Default iteration cap.
    #[must_use]
    pub const fn iteration_limit(&self) -> usize {
        self.iteration_limit
    }

    /// Runs one turn: `history` plus `user_text`, looping through tool calls
    /// until the model answers or the cap is hit.
    ///
    /// `iteration_limit` overrides the agent's cap for this turn; values
    /// below one are raised to one. Tool failures reach the model as
    /// observations. Hitting the cap returns a reply with no answer.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] only when the model provider itself fails.
    pub fn invoke(
        &self,
        history: &[ChatMessage],
        user_text: &str,
        iteration_limit: Option<usize>,
    ) -> Result<AgentReply, AgentError> {
        let limit = iteration_limit.unwrap_or(self.iteration_limit).max(1);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        messages.push(ChatMessage::user(user_text));
        let turn_start = messages.len();

        let mut request = ChatRequest::new(&self.model, messages)
            .with_temperature(self.temperature)
            .with_tools(self.tools.definitions());

        let executor = ToolExecutor::new(&self.tools);
        let outcome = agentic_loop(
            self.provider.as_ref(),
            &self.runtime,
            &mut request,
            &executor,
            limit,
        )?;

        let answer = match outcome {
            LoopOutcome::Answered(response) if !response.content.trim().is_empty() => {
                request.messages.push(ChatMessage::assistant(&response.content));
                Some(response.content)
            }
            LoopOutcome::Answered(_) => {
                debug!("model finished with empty content");
                None
            }
            LoopOutcome::Exhausted { iterations } => {
                warn!(iterations, "iteration limit reached without an answer");
                None
            }
        };

        let tools_used = request.messages[turn_start..]
            .iter()
            .flat_map(|m| m.tool_calls.iter().map(|c| c.name.clone()))
            .collect();

        request.messages.remove(0);
        Ok(AgentReply {
            messages: request.messages,
            answer,
            tools_used,
        })
    }
}

impl std::fmt::Debug for QaAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QaAgent")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("tools", &self.tools.names())
            .field("variant", &self.variant)
            .field("iteration_limit", &self.iteration_limit)
            .finish_non_exhaustive()
    }
}
