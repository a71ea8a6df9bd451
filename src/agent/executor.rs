//! Tool executor that dispatches tool calls to an agent's capabilities.
//!
//! Every outcome becomes a [`ToolResult`]: oversized or malformed arguments,
//! unknown tool names and capability failures are all reported back to the
//! model as observations. Nothing here returns an error to the loop.

use serde_json::Value;
use tracing::debug;

use crate::error::AgentError;

use super::tool::{ToolCall, ToolResult, ToolSet};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Executes tool calls against a fixed [`ToolSet`].
#[derive(Debug)]
pub struct ToolExecutor<'a> {
    tools: &'a ToolSet,
}

impl<'a> ToolExecutor<'a> {
    /// Creates an executor over the given tool set.
    #[must_use]
    pub const fn new(tools: &'a ToolSet) -> Self {
        Self { tools }
    }

    /// Dispatches a tool call to the matching capability.
    ///
    /// Validates raw argument size before dispatch to prevent oversized payloads.
    #[must_use]
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        let outcome = self.dispatch(call);
        match outcome {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(content) => {
                debug!(tool = call.name, error = content, "tool call failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content,
                    is_error: true,
                }
            }
        }
    }

    fn dispatch(&self, call: &ToolCall) -> Result<String, String> {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Err(AgentError::ToolExecution {
                name: call.name.clone(),
                message: format!(
                    "arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            }
            .to_string());
        }

        let Some(capability) = self.tools.get(&call.name) else {
            return Err(AgentError::ToolExecution {
                name: call.name.clone(),
                message: format!(
                    "unknown tool; available tools: {}",
                    self.tools.names().join(", ")
                ),
            }
            .to_string());
        };

        let args = parse_arguments(&call.arguments).map_err(|e| {
            AgentError::ToolExecution {
                name: call.name.clone(),
                message: format!("invalid arguments: {e}"),
            }
            .to_string()
        })?;

        capability.invoke(&args)
    }
}

/// Parses tool arguments; an empty string means no arguments.
fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tool::tests::echo_capability;
    use crate::agent::tool::{Capability, CapabilitySource, ToolDefinition};
    use serde_json::json;
    use std::sync::Arc;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn tools() -> ToolSet {
        let failing = Capability::new(
            ToolDefinition {
                name: "read_file".to_string(),
                description: "fails".to_string(),
                parameters: json!({"type": "object"}),
            },
            CapabilitySource::Local,
            Arc::new(|_: &Value| Err("Error in read_file: no such file".to_string())),
        );
        ToolSet::new(vec![
            echo_capability("document_search", CapabilitySource::Local),
            failing,
        ])
    }

    #[test]
    fn test_execute_dispatches_by_name() {
        let tools = tools();
        let executor = ToolExecutor::new(&tools);
        let result = executor.execute(&call("document_search", r#"{"query":"risk"}"#));
        assert!(!result.is_error);
        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.content, r#"{"query":"risk"}"#);
    }

    #[test]
    fn test_unknown_tool_names_the_tool() {
        let tools = tools();
        let executor = ToolExecutor::new(&tools);
        let result = executor.execute(&call("launch_rocket", "{}"));
        assert!(result.is_error);
        assert!(result.content.contains("launch_rocket"));
        assert!(result.content.contains("document_search"));
    }

    #[test]
    fn test_capability_failure_becomes_observation() {
        let tools = tools();
        let executor = ToolExecutor::new(&tools);
        let result = executor.execute(&call("read_file", r#"{"file_path":"x"}"#));
        assert!(result.is_error);
        assert_eq!(result.content, "Error in read_file: no such file");
    }

    #[test]
    fn test_malformed_arguments() {
        let tools = tools();
        let executor = ToolExecutor::new(&tools);
        let result = executor.execute(&call("document_search", "{not json"));
        assert!(result.is_error);
        assert!(result.content.contains("invalid arguments"));
    }

    #[test]
    fn test_empty_arguments_are_an_empty_object() {
        let tools = tools();
        let executor = ToolExecutor::new(&tools);
        let result = executor.execute(&call("document_search", ""));
        assert!(!result.is_error);
        assert_eq!(result.content, "{}");
    }

    #[test]
    fn test_oversized_arguments_rejected() {
        let tools = tools();
        let executor = ToolExecutor::new(&tools);
        let big = format!(r#"{{"query":"{}"}}"#, "x".repeat(MAX_TOOL_ARGS_LEN));
        let result = executor.execute(&call("document_search", &big));
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }
}
