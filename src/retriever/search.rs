//! Document retriever: single-pass retrieve-then-generate over the index.
//!
//! The index handle and the model handle are both built on first use and
//! then reused for the lifetime of the retriever. A failed build is not
//! memoized, so a later call can succeed once the index file appears.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::embedding::OpenAiEmbedder;
use super::index::{EmbeddedIndex, SqliteIndex, VectorIndex};
use crate::agent::client::{ProviderFactory, openai_factory};
use crate::agent::message::{ChatMessage, ChatRequest};
use crate::agent::prompt::build_answer_prompt;
use crate::agent::provider::LlmProvider;
use crate::agent::tool::{Capability, CapabilitySource, ToolDefinition};
use crate::config::{RetrievalConfig, Settings};
use crate::error::{AgentError, IndexError, Result};
use crate::runtime::BlockingRuntime;

/// Name of the document search capability.
pub const DOCUMENT_TOOL_NAME: &str = "document_search";

/// Passages retrieved when the caller gives no count.
pub const DEFAULT_TOP_K: usize = 4;

const DOCUMENT_TOOL_DESCRIPTION: &str = "Search the indexed documents and provide an \
executive-level answer about their missions, engineering, policies and risks.";

/// Builds an index handle on demand.
pub type IndexFactory = Arc<dyn Fn() -> std::result::Result<Arc<dyn VectorIndex>, IndexError> + Send + Sync>;

/// Index diagnostics, with failures reported as data.
#[derive(Debug, Clone, Serialize)]
pub struct IndexDiagnostics {
    /// Passages in the collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    /// Collection identifier.
    pub collection: String,
    /// Index file path.
    pub index_path: PathBuf,
    /// Why the index could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answers questions from the document index.
pub struct DocumentRetriever {
    config: RetrievalConfig,
    answer_template: String,
    runtime: Arc<BlockingRuntime>,
    index_factory: IndexFactory,
    model_factory: ProviderFactory,
    index: OnceLock<Arc<dyn VectorIndex>>,
    model: OnceLock<Arc<dyn LlmProvider>>,
}

impl DocumentRetriever {
    /// Creates a retriever backed by the `SQLite` index and `OpenAI` services.
    ///
    /// Nothing is opened or contacted until the first search.
    #[must_use]
    pub fn new(settings: &Settings, answer_template: &str, runtime: Arc<BlockingRuntime>) -> Self {
        let config = settings.retrieval_config();
        let index_factory = sqlite_factory(settings, Arc::clone(&runtime));
        Self::with_factories(
            config,
            answer_template,
            runtime,
            index_factory,
            openai_factory(settings),
        )
    }

    /// Creates a retriever with explicit handle factories.
    #[must_use]
    pub fn with_factories(
        config: RetrievalConfig,
        answer_template: &str,
        runtime: Arc<BlockingRuntime>,
        index_factory: IndexFactory,
        model_factory: ProviderFactory,
    ) -> Self {
        Self {
            config,
            answer_template: answer_template.to_string(),
            runtime,
            index_factory,
            model_factory,
            index: OnceLock::new(),
            model: OnceLock::new(),
        }
    }

    /// Index handle, opened on first access.
    pub fn index(&self) -> std::result::Result<Arc<dyn VectorIndex>, IndexError> {
        if let Some(index) = self.index.get() {
            return Ok(Arc::clone(index));
        }
        let created = (self.index_factory)()?;
        info!(path = %self.config.index_path.display(), "document index opened");
        Ok(Arc::clone(self.index.get_or_init(|| created)))
    }

    /// Model handle, built on first access.
    pub fn model(&self) -> std::result::Result<Arc<dyn LlmProvider>, AgentError> {
        if let Some(model) = self.model.get() {
            return Ok(Arc::clone(model));
        }
        let created = (self.model_factory)()?;
        debug!(provider = created.name(), model = %self.config.model, "retriever model ready");
        Ok(Arc::clone(self.model.get_or_init(|| created)))
    }

    /// Whether the index handle has been built.
    #[must_use]
    pub fn is_index_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    /// Whether the model handle has been built.
    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Answers `query` from the `k` nearest passages.
    ///
    /// Passages are joined with a blank line and handed to the model through
    /// the answer template in one call. The model's text is returned as is.
    pub fn search(&self, query: &str, k: usize) -> Result<String> {
        let passages = self.index()?.similarity_search(query, k)?;
        debug!(query, k, found = passages.len(), "retrieved passages");

        let context = passages
            .iter()
            .map(|p| p.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = build_answer_prompt(&self.answer_template, &context, query);

        let model = self.model()?;
        // Service-default temperature for the answer-writing call.
        let request = ChatRequest::new(&self.config.model, vec![ChatMessage::user(&prompt)]);
        let response = self.runtime.block_on(model.chat(&request))?;
        Ok(response.content)
    }

    /// Wraps [`search`](Self::search) as the `document_search` capability.
    ///
    /// Failures are returned as `Error in document_search: ...` strings.
    #[must_use]
    pub fn get_tool(self: &Arc<Self>) -> Capability {
        let retriever = Arc::clone(self);
        Capability::new(
            ToolDefinition {
                name: DOCUMENT_TOOL_NAME.to_string(),
                description: DOCUMENT_TOOL_DESCRIPTION.to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The question to answer from the documents"
                        },
                        "k": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Number of passages to retrieve (default 4)"
                        }
                    },
                    "required": ["query"]
                }),
            },
            CapabilitySource::Local,
            Arc::new(move |args: &Value| {
                let query = args
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or_else(|| tool_error(&"missing required string field 'query'"))?;
                let k = args
                    .get("k")
                    .and_then(Value::as_u64)
                    .and_then(|k| usize::try_from(k).ok())
                    .filter(|k| *k > 0)
                    .unwrap_or(DEFAULT_TOP_K);
                retriever.search(query, k).map_err(|e| tool_error(&e))
            }),
        )
    }

    /// Index diagnostics. Access failures land in the `error` field.
    #[must_use]
    pub fn get_info(&self) -> IndexDiagnostics {
        let mut diagnostics = IndexDiagnostics {
            chunk_count: None,
            collection: self.config.collection.clone(),
            index_path: self.config.index_path.clone(),
            error: None,
        };
        match self.index().and_then(|index| index.info()) {
            Ok(info) => {
                diagnostics.chunk_count = Some(info.chunk_count);
                diagnostics.collection = info.collection;
                diagnostics.index_path = info.index_path;
            }
            Err(e) => diagnostics.error = Some(e.to_string()),
        }
        diagnostics
    }
}

impl std::fmt::Debug for DocumentRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRetriever")
            .field("config", &self.config)
            .field("index_loaded", &self.is_index_loaded())
            .field("model_loaded", &self.is_model_loaded())
            .finish_non_exhaustive()
    }
}

fn tool_error(detail: &dyn std::fmt::Display) -> String {
    format!("Error in {DOCUMENT_TOOL_NAME}: {detail}")
}

/// Factory opening the configured `SQLite` index with an `OpenAI` embedder.
fn sqlite_factory(settings: &Settings, runtime: Arc<BlockingRuntime>) -> IndexFactory {
    let settings = settings.clone();
    Arc::new(move || {
        let store = SqliteIndex::open(&settings.index_path, &settings.collection)?;
        let embedder = Arc::new(OpenAiEmbedder::new(&settings));
        let index: Arc<dyn VectorIndex> =
            Arc::new(EmbeddedIndex::new(store, embedder, Arc::clone(&runtime)));
        Ok(index)
    })
}
