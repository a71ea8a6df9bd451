//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Works with any `OpenAI`-compatible chat completions endpoint through the
//! base URL in [`Settings`]. Translation to and from the SDK's wire types is
//! kept in free functions so it can be tested without a network.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessage, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionResponseMessage, ChatCompletionTool, ChatCompletionToolType, CompletionUsage,
    CreateChatCompletionRequest, FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::agent::tool::{ToolCall, ToolDefinition};
use crate::config::Settings;
use crate::error::AgentError;

/// `OpenAI`-compatible chat model.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a provider from application settings.
    ///
    /// A missing credential is not an error here: it was already reported
    /// as a configuration warning, and the API call itself will fail.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut config =
            OpenAIConfig::new().with_api_key(settings.api_key.as_deref().unwrap_or_default());
        if let Some(base_url) = &settings.base_url {
            config = config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(config),
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let response = self
            .client
            .chat()
            .create(to_wire_request(request))
            .await
            .map_err(|e| api_error(&e))?;

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(AgentError::ApiRequest {
                message: "response contained no choices".to_string(),
                status: None,
            });
        };
        debug!(
            model = %response.model,
            finish_reason = ?choice.finish_reason,
            "chat completion received"
        );
        Ok(from_wire_message(
            choice.message,
            choice.finish_reason,
            response.usage,
        ))
    }
}

/// Builds the SDK request. The temperature is passed through as given,
/// including zero.
fn to_wire_request(request: &ChatRequest) -> CreateChatCompletionRequest {
    let tools = (!request.tools.is_empty())
        .then(|| request.tools.iter().map(to_wire_tool).collect());

    CreateChatCompletionRequest {
        model: request.model.clone(),
        messages: request.messages.iter().map(to_wire_message).collect(),
        temperature: request.temperature,
        tools,
        ..Default::default()
    }
}

fn to_wire_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.parameters.clone()),
            strict: None,
        },
    }
}

fn to_wire_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
    let text = msg.content.clone();
    match msg.role {
        Role::System => ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(text),
            name: None,
        }
        .into(),
        Role::User => ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(text),
            name: None,
        }
        .into(),
        Role::Assistant => {
            let tool_calls = (!msg.tool_calls.is_empty()).then(|| {
                msg.tool_calls
                    .iter()
                    .map(|call| ChatCompletionMessageToolCall {
                        id: call.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    })
                    .collect()
            });
            let content = (!text.is_empty())
                .then_some(ChatCompletionRequestAssistantMessageContent::Text(text));

            #[allow(deprecated)]
            let assistant = ChatCompletionRequestAssistantMessage {
                content,
                name: None,
                tool_calls,
                refusal: None,
                audio: None,
                function_call: None,
            };
            assistant.into()
        }
        Role::Tool => ChatCompletionRequestToolMessage {
            content: ChatCompletionRequestToolMessageContent::Text(text),
            tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
        }
        .into(),
    }
}

fn from_wire_message(
    message: ChatCompletionResponseMessage,
    finish_reason: Option<FinishReason>,
    usage: Option<CompletionUsage>,
) -> ChatResponse {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    ChatResponse {
        content: message.content.unwrap_or_default(),
        usage: usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        tool_calls,
        finish_reason: finish_reason.map(|r| format!("{r:?}").to_lowercase()),
    }
}

/// Maps an SDK error, keeping the HTTP status when the transport reports one.
fn api_error(err: &OpenAIError) -> AgentError {
    let status = match err {
        OpenAIError::Reqwest(e) => e.status().map(|s| s.as_u16()),
        _ => None,
    };
    AgentError::ApiRequest {
        message: err.to_string(),
        status,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "list_directory".to_string(),
            arguments: r#"{"path":"."}"#.to_string(),
        }
    }

    #[test]
    fn test_api_error_keeps_message() {
        let err = api_error(&OpenAIError::InvalidArgument("model is required".to_string()));
        match err {
            AgentError::ApiRequest { message, status } => {
                assert!(message.contains("model is required"));
                assert!(status.is_none());
            }
            other => panic!("Expected ApiRequest, got: {other}"),
        }
    }

    #[test]
    fn test_new_without_credential() {
        let provider = OpenAiProvider::new(&Settings::builder().build());
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn test_zero_temperature_is_sent() {
        let request = ChatRequest::new("gpt-4.1", vec![ChatMessage::user("q")]).with_temperature(0.0);
        let wire = to_wire_request(&request);
        assert_eq!(wire.temperature, Some(0.0));
        assert_eq!(wire.model, "gpt-4.1");
        assert!(wire.tools.is_none());
    }

    #[test]
    fn test_unset_temperature_is_omitted() {
        let wire = to_wire_request(&ChatRequest::new("gpt-4.1", vec![ChatMessage::user("q")]));
        assert!(wire.temperature.is_none());
    }

    #[test]
    fn test_tools_are_offered() {
        let request = ChatRequest::new("gpt-4.1", Vec::new()).with_tools(vec![ToolDefinition {
            name: "document_search".to_string(),
            description: "Search the document index".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }]);
        let wire = to_wire_request(&request);
        let tools = wire.tools.unwrap_or_default();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "document_search");
    }

    #[test]
    fn test_message_roles() {
        assert!(matches!(
            to_wire_message(&ChatMessage::system("s")),
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            to_wire_message(&ChatMessage::user("u")),
            ChatCompletionRequestMessage::User(_)
        ));
        assert!(matches!(
            to_wire_message(&ChatMessage::tool_result("call_1", "{}")),
            ChatCompletionRequestMessage::Tool(_)
        ));
    }

    #[test]
    fn test_tool_call_turn_has_no_content() {
        let ChatCompletionRequestMessage::Assistant(wire) =
            to_wire_message(&ChatMessage::tool_calls(vec![call()]))
        else {
            panic!("Expected Assistant message");
        };
        assert!(wire.content.is_none());
        assert_eq!(wire.tool_calls.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_response_with_tool_calls() {
        let message: ChatCompletionResponseMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": "read_file", "arguments": "{\"file_path\":\"a.txt\"}" }
            }]
        }))
        .unwrap_or_else(|e| panic!("fixture: {e}"));

        let response = from_wire_message(message, Some(FinishReason::ToolCalls), None);
        assert!(!response.is_final());
        assert!(response.content.is_empty());
        assert_eq!(response.tool_calls[0].name, "read_file");
        assert_eq!(response.finish_reason.as_deref(), Some("toolcalls"));
        assert_eq!(response.usage.total_tokens, 0);
    }
}
