//! End-to-end question answering with a scripted model.

#![allow(clippy::panic)]

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{
    KeywordEmbedder, RISK_PASSAGE, ScriptedModel, call, refused_endpoint, text, write_index,
};
use docqa::agent::{AgentComposer, LlmProvider, PromptSet, PromptVariant, Role, shared_factory};
use docqa::config::Settings;
use docqa::error::IndexError;
use docqa::mcp::McpBridge;
use docqa::retriever::{DocumentRetriever, EmbeddedIndex, SqliteIndex, VectorIndex};
use docqa::runtime::BlockingRuntime;
use tempfile::TempDir;

const QUESTION: &str = "What are the risk strategies?";

fn composer(index_dir: &Path, endpoints: Vec<String>, model: Arc<ScriptedModel>) -> AgentComposer {
    let runtime = Arc::new(BlockingRuntime::new().unwrap_or_else(|e| panic!("runtime: {e}")));
    let index_path = write_index(index_dir, "documents");
    let settings = Settings::builder()
        .api_key("sk-test")
        .index_path(&index_path)
        .server_urls(endpoints.join(","))
        .build();

    let prompts = PromptSet::defaults();
    let provider: Arc<dyn LlmProvider> = model;
    let factory = shared_factory(provider);

    let index_runtime = Arc::clone(&runtime);
    let retriever = Arc::new(DocumentRetriever::with_factories(
        settings.retrieval_config(),
        &prompts.answer_template,
        Arc::clone(&runtime),
        Arc::new(move || -> Result<Arc<dyn VectorIndex>, IndexError> {
            let store = SqliteIndex::open(&index_path, "documents")?;
            Ok(Arc::new(EmbeddedIndex::new(
                store,
                Arc::new(KeywordEmbedder),
                Arc::clone(&index_runtime),
            )))
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
fn document_only_question_is_answered_from_the_index() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let model = ScriptedModel::new(vec![
        call("document_search", &format!(r#"{{"query":"{QUESTION}"}}"#)),
        text("Identify risks early and track them in a register."),
        text("The documents recommend identifying risks early and keeping a risk register."),
    ]);
    let composer = composer(temp.path(), Vec::new(), Arc::clone(&model));

    let agent = composer
        .create_agent(true, None)
        .unwrap_or_else(|e| panic!("create_agent: {e}"));
    assert_eq!(agent.tools().names(), vec!["document_search"]);
    assert_eq!(agent.variant(), PromptVariant::DocumentOnly);

    let reply = agent
        .invoke(&[], QUESTION, None)
        .unwrap_or_else(|e| panic!("invoke: {e}"));

    let answer = reply.answer.unwrap_or_default();
    assert!(!answer.is_empty());
    assert_eq!(reply.tools_used, vec!["document_search"]);

    // agent, retriever, agent
    assert_eq!(model.request_count(), 3);
    let retrieval = model.request(1);
    assert!(retrieval.tools.is_empty());
    assert!(retrieval.temperature.is_none());
    let prompt = &retrieval.messages[0].content;
    assert!(prompt.contains(RISK_PASSAGE));
    assert!(prompt.contains(QUESTION));

    let tool_message = reply
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap_or_else(|| panic!("no tool message"));
    assert_eq!(
        tool_message.content,
        "Identify risks early and track them in a register."
    );
    assert_eq!(composer.bridge().connection_attempts(), 0);
}

#[test]
fn refused_endpoint_still_yields_a_usable_agent() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let model = ScriptedModel::new(vec![text("Answered without remote tools.")]);
    let composer = composer(
        temp.path(),
        vec![refused_endpoint()],
        Arc::clone(&model),
    );
    assert!(composer.behavior().include_remote);

    assert!(composer.bridge().get_callables().is_empty());

    let agent = composer
        .create_agent(true, None)
        .unwrap_or_else(|e| panic!("create_agent: {e}"));
    assert_eq!(agent.tools().names(), vec!["document_search"]);
    assert_eq!(agent.variant(), PromptVariant::DocumentOnly);
    // The failed attempt is remembered.
    assert_eq!(composer.bridge().connection_attempts(), 1);

    let reply = agent
        .invoke(&[], QUESTION, None)
        .unwrap_or_else(|e| panic!("invoke: {e}"));
    assert_eq!(reply.answer.as_deref(), Some("Answered without remote tools."));
}

#[cfg(feature = "fs-server")]
#[test]
fn reachable_server_adds_filesystem_tools_and_remote_prompt() {
    use docqa::agent::prompt::REMOTE_TOOLS_PROMPT;

    let server = common::start_server();
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let model = ScriptedModel::new(vec![
        call("list_directory", r#"{"path":"."}"#),
        text("one file"),
    ]);
    let composer = composer(
        temp.path(),
        vec![refused_endpoint(), server.url.clone()],
        Arc::clone(&model),
    );

    let agent = composer
        .create_agent(true, None)
        .unwrap_or_else(|e| panic!("create_agent: {e}"));
    assert_eq!(
        agent.tools().names(),
        vec![
            "document_search",
            "list_directory",
            "read_file",
            "search_files",
            "get_file_info"
        ]
    );
    assert_eq!(agent.variant(), PromptVariant::RemoteTools);
    assert_eq!(agent.system_prompt(), REMOTE_TOOLS_PROMPT);
    assert_eq!(composer.bridge().connection_attempts(), 2);

    let reply = agent
        .invoke(&[], "List current directory", None)
        .unwrap_or_else(|e| panic!("invoke: {e}"));
    assert_eq!(reply.answer.as_deref(), Some("one file"));
    assert_eq!(reply.tools_used, vec!["list_directory"]);

    let first = model.request(0);
    assert_eq!(first.tools.len(), 5);
    assert_eq!(first.messages[0].content, REMOTE_TOOLS_PROMPT);

    let listing = reply
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap_or_else(|| panic!("no tool message"));
    assert!(listing.content.contains("notes.txt"), "{}", listing.content);
    assert!(listing.content.contains("reports"), "{}", listing.content);
}

#[test]
fn iteration_cap_yields_no_answer_instead_of_an_error() {
    let temp = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let model = ScriptedModel::new(vec![
        call("document_search", r#"{"query":"risk"}"#),
        text("Retrieved answer."),
        text("This answer should never be requested."),
    ]);
    let composer = composer(temp.path(), Vec::new(), Arc::clone(&model));
    let agent = composer
        .create_agent(false, None)
        .unwrap_or_else(|e| panic!("create_agent: {e}"));

    let reply = agent
        .invoke(&[], QUESTION, Some(1))
        .unwrap_or_else(|e| panic!("invoke: {e}"));

    assert!(reply.is_unanswered());
    assert_eq!(reply.tools_used, vec!["document_search"]);
    // One agent call plus the retriever's own call; no second agent call.
    assert_eq!(model.request_count(), 2);
}
