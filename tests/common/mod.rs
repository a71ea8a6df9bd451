//! Fakes shared by the integration tests.

#![allow(dead_code, clippy::panic)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa::agent::{ChatRequest, ChatResponse, LlmProvider, TokenUsage, ToolCall};
use docqa::error::{AgentError, IndexError};
use docqa::retriever::{Embedder, SqliteIndex};

/// Replays canned responses in order, then answers "done".
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<ChatResponse>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<ChatResponse>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn request(&self, i: usize) -> ChatRequest {
        self.requests
            .lock()
            .unwrap_or_else(|e| panic!("lock: {e}"))
            .get(i)
            .cloned()
            .unwrap_or_else(|| panic!("no request {i}"))
    }
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        Ok(next.unwrap_or_else(|| text("done")))
    }
}

pub fn text(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage::default(),
        tool_calls: Vec::new(),
        finish_reason: Some("stop".to_string()),
    }
}

pub fn call(name: &str, arguments: &str) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        usage: TokenUsage::default(),
        tool_calls: vec![ToolCall {
            id: "call_0".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }],
        finish_reason: Some("tool_calls".to_string()),
    }
}

const KEYWORDS: [&str; 3] = ["risk", "budget", "launch"];

/// Embeds text as a keyword histogram so similarity is predictable.
pub struct KeywordEmbedder;

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let n = lower.matches(k).count() as f32;
            n + 0.01
        })
        .collect()
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keywords"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        Ok(keyword_vector(text))
    }
}

pub const RISK_PASSAGE: &str = "Risk strategies: identify risk early and keep a risk register.";

/// Writes a three-passage index into `dir`.
pub fn write_index(dir: &Path, collection: &str) -> PathBuf {
    let path = dir.join("vectordb.sqlite3");
    let index = SqliteIndex::create(&path, collection).unwrap_or_else(|e| panic!("create: {e}"));
    for (content, source) in [
        (RISK_PASSAGE, "risk.pdf"),
        ("The budget was approved for the next budget cycle.", "budget.pdf"),
        ("The launch window opens in spring.", "launch.pdf"),
    ] {
        index
            .add_passage(content, Some(source), &keyword_vector(content))
            .unwrap_or_else(|e| panic!("add: {e}"));
    }
    path
}

/// An endpoint on a local port nothing listens on.
pub fn refused_endpoint() -> String {
    let listener =
        std::net::TcpListener::bind("127.0.0.1:0").unwrap_or_else(|e| panic!("bind: {e}"));
    let port = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("local_addr: {e}"))
        .port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// A filesystem tool server on an ephemeral port, stopped on drop.
///
/// The served root holds `notes.txt` and `reports/risk_q1.pdf`.
#[cfg(feature = "fs-server")]
pub struct LiveServer {
    pub url: String,
    _shutdown: tokio::sync::oneshot::Sender<()>,
    _runtime: tokio::runtime::Runtime,
    _root: tempfile::TempDir,
}

#[cfg(feature = "fs-server")]
pub fn start_server() -> LiveServer {
    let root = tempfile::TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
    std::fs::write(root.path().join("notes.txt"), "alpha\nbeta\ngamma\n")
        .unwrap_or_else(|e| panic!("write: {e}"));
    std::fs::create_dir(root.path().join("reports")).unwrap_or_else(|e| panic!("mkdir: {e}"));
    std::fs::write(root.path().join("reports").join("risk_q1.pdf"), b"%PDF")
        .unwrap_or_else(|e| panic!("write: {e}"));

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| panic!("runtime: {e}"));
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap_or_else(|e| panic!("bind: {e}"));
    let addr = listener
        .local_addr()
        .unwrap_or_else(|e| panic!("local_addr: {e}"));

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    runtime.spawn(docqa::mcp::serve_http_on(
        listener,
        Some(root.path().to_path_buf()),
        async move {
            let _ = rx.await;
        },
    ));

    LiveServer {
        url: format!("http://{addr}"),
        _shutdown: tx,
        _runtime: runtime,
        _root: root,
    }
}
