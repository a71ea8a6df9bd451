//! Agent composition.
//!
//! Collects the document search capability and whatever the remote bridge
//! could provide, picks the matching system prompt, and binds both to a
//! model handle. An unreachable remote server only shrinks the tool set.

use std::sync::Arc;

use tracing::info;

use super::client::ProviderFactory;
use super::prompt::{PromptSet, PromptVariant};
use super::qa_agent::QaAgent;
use super::tool::ToolSet;
use crate::config::AgentBehavior;
use crate::error::AgentError;
use crate::mcp::McpBridge;
use crate::retriever::DocumentRetriever;
use crate::runtime::BlockingRuntime;

/// Builds [`QaAgent`]s from the process-wide components.
pub struct AgentComposer {
    behavior: AgentBehavior,
    retriever: Arc<DocumentRetriever>,
    bridge: Arc<McpBridge>,
    provider_factory: ProviderFactory,
    prompts: PromptSet,
    runtime: Arc<BlockingRuntime>,
}

impl AgentComposer {
    /// Creates a composer over already-constructed components.
    #[must_use]
    pub fn new(
        behavior: AgentBehavior,
        retriever: Arc<DocumentRetriever>,
        bridge: Arc<McpBridge>,
        provider_factory: ProviderFactory,
        prompts: PromptSet,
        runtime: Arc<BlockingRuntime>,
    ) -> Self {
        Self {
            behavior,
            retriever,
            bridge,
            provider_factory,
            prompts,
            runtime,
        }
    }

    /// Behavior settings agents are built with.
    #[must_use]
    pub const fn behavior(&self) -> &AgentBehavior {
        &self.behavior
    }

    /// The shared document retriever.
    #[must_use]
    pub const fn retriever(&self) -> &Arc<DocumentRetriever> {
        &self.retriever
    }

    /// The shared remote tool bridge.
    #[must_use]
    pub const fn bridge(&self) -> &Arc<McpBridge> {
        &self.bridge
    }

    /// The tool set an agent would get: document search first, then the
    /// remote tools when `include_remote` is set and a server is reachable.
    #[must_use]
    pub fn capabilities(&self, include_remote: bool) -> ToolSet {
        let mut capabilities = vec![self.retriever.get_tool()];
        if include_remote {
            capabilities.extend(self.bridge.get_callables());
        }
        ToolSet::new(capabilities)
    }

    /// Composes an agent.
    ///
    /// `model` overrides the configured chat model. The remote-tools prompt
    /// is chosen only if at least one remote tool was bound.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model handle cannot be built. Remote
    /// connection failures are not errors.
    pub fn create_agent(&self, include_remote: bool, model: Option<&str>) -> Result<QaAgent, AgentError> {
        let tools = self.capabilities(include_remote);
        let variant = PromptVariant::for_tools(tools.has_remote());
        let provider = (self.provider_factory)()?;
        let model = model.unwrap_or(&self.behavior.model);

        info!(
            model,
            tools = tools.len(),
            variant = ?variant,
            "agent composed"
        );

        Ok(QaAgent::new(
            provider,
            model,
            self.behavior.temperature,
            tools,
            self.prompts.system_prompt(variant),
            variant,
            self.behavior.iteration_limit,
            Arc::clone(&self.runtime),
        ))
    }
}

impl std::fmt::Debug for AgentComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentComposer")
            .field("behavior", &self.behavior)
            .field("retriever", &self.retriever)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::client::shared_factory;
    use crate::agent::qa_agent::tests::{ScriptedProvider, text};
    use crate::config::Settings;
    use crate::error::IndexError;
    use crate::retriever::VectorIndex;

    use std::time::Duration;

    fn composer(endpoints: Vec<String>, provider: Arc<ScriptedProvider>) -> AgentComposer {
        let runtime =
            Arc::new(BlockingRuntime::new().unwrap_or_else(|e| panic!("runtime failed: {e}")));
        let dir = std::env::temp_dir().join("docqa-composer-missing.sqlite3");
        let settings = Settings::builder().index_path(dir).build();
        let prompts = PromptSet::defaults();
        let factory = shared_factory(provider);
        let retriever = Arc::new(DocumentRetriever::with_factories(
            settings.retrieval_config(),
            &prompts.answer_template,
            Arc::clone(&runtime),
            Arc::new(|| -> Result<Arc<dyn VectorIndex>, IndexError> {
                Err(IndexError::Query("no index in this test".to_string()))
            }),
            Arc::clone(&factory),
        ));
        let bridge = Arc::new(McpBridge::new(
            endpoints,
            Duration::from_secs(2),
            Arc::clone(&runtime),
        ));
        AgentComposer::new(
            settings.agent_behavior(),
            retriever,
            bridge,
            factory,
            prompts,
            runtime,
        )
    }

    #[test]
    fn test_document_only_without_endpoints() {
        let c = composer(Vec::new(), Arc::new(ScriptedProvider::new(Vec::new())));
        let agent = c
            .create_agent(true, None)
            .unwrap_or_else(|e| panic!("create_agent failed: {e}"));
        assert_eq!(agent.tools().names(), vec!["document_search"]);
        assert_eq!(agent.variant(), PromptVariant::DocumentOnly);
        assert_eq!(agent.system_prompt(), PromptSet::defaults().document_only);
        assert_eq!(c.bridge().connection_attempts(), 0);
    }

    #[test]
    fn test_include_remote_false_skips_bridge() {
        let c = composer(
            vec!["http://127.0.0.1:9".to_string()],
            Arc::new(ScriptedProvider::new(Vec::new())),
        );
        let agent = c
            .create_agent(false, Some("other-model"))
            .unwrap_or_else(|e| panic!("create_agent failed: {e}"));
        assert_eq!(agent.model(), "other-model");
        assert_eq!(agent.tools().len(), 1);
        assert_eq!(c.bridge().connection_attempts(), 0);
    }

    #[test]
    fn test_document_failure_reaches_model_as_observation() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            crate::agent::qa_agent::tests::calls(&[("document_search", r#"{"query":"risk"}"#)]),
            text("The documents are unavailable right now."),
        ]));
        let c = composer(Vec::new(), Arc::clone(&provider));
        let reply = c
            .create_agent(true, None)
            .and_then(|a| a.invoke(&[], "What are the risk strategies?", None))
            .unwrap_or_else(|e| panic!("invoke failed: {e}"));

        assert_eq!(
            reply.answer.as_deref(),
            Some("The documents are unavailable right now.")
        );
        let tool_output = &reply.messages[2].content;
        assert!(tool_output.starts_with("Error in document_search:"));
    }
}
