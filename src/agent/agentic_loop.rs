//! Agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the model,
//! executes any tool calls in the response, appends results, and repeats
//! until the model produces a final text response or the iteration limit
//! is reached.
//!
//! The loop is synchronous. Each model call is driven to completion on the
//! [`BlockingRuntime`]; tool calls run in the order the model listed them.

use tracing::debug;

use super::executor::ToolExecutor;
use super::message::{ChatMessage, ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use crate::error::AgentError;
use crate::runtime::BlockingRuntime;

/// How a loop run ended.
#[derive(Debug, Clone)]
pub enum LoopOutcome {
    /// The model produced a response without tool calls.
    Answered(ChatResponse),
    /// The iteration cap was reached while the model still wanted tools.
    Exhausted {
        /// Iterations performed.
        iterations: usize,
    },
}

/// Runs an agentic loop: model → tool calls → tool results → model → …
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `runtime` - Drives each provider call to completion.
/// * `request` - Initial chat request (mutated in-place with tool messages).
/// * `executor` - Dispatches tool calls to capabilities.
/// * `max_iterations` - Number of model calls allowed.
///
/// # Errors
///
/// Propagates provider errors. Tool failures are observations, and running
/// out of iterations is [`LoopOutcome::Exhausted`], neither is an error.
pub fn agentic_loop(
    provider: &dyn LlmProvider,
    runtime: &BlockingRuntime,
    request: &mut ChatRequest,
    executor: &ToolExecutor<'_>,
    max_iterations: usize,
) -> Result<LoopOutcome, AgentError> {
    for iteration in 0..max_iterations {
        let response = runtime.block_on(provider.chat(request))?;

        if response.is_final() {
            debug!(iteration, "agentic loop completed with final text response");
            return Ok(LoopOutcome::Answered(response));
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request
            .messages
            .push(ChatMessage::tool_calls(response.tool_calls.clone()));

        for call in &response.tool_calls {
            let result = executor.execute(call);
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            request
                .messages
                .push(ChatMessage::tool_result(&result.tool_call_id, &result.content));
        }
    }

    debug!(max_iterations, "agentic loop exhausted without a final answer");
    Ok(LoopOutcome::Exhausted {
        iterations: max_iterations,
    })
}
