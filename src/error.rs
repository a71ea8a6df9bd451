//! Error types for docqa.
//!
//! One top-level [`Error`] with per-domain enums converted into it. Errors
//! below the agent composer never cross the tool-invocation boundary: tool
//! wrappers render them to observation strings instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Agent or model provider error.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Document index error.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Remote tool bridge error.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// CLI command error.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid values supplied explicitly (CLI flags). Environment values never
/// produce this error; they fall back to defaults with a warning.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A value failed validation.
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Errors from the language-model provider and the reasoning loop.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The provider API call failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error detail from the SDK.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// A tool call could not be executed.
    #[error("tool {name} failed: {message}")]
    ToolExecution {
        /// Tool name as requested by the model.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// The async runtime could not be created.
    #[error("failed to create async runtime: {0}")]
    Runtime(String),

    /// Prompt template files could not be read or written.
    #[error("prompt template error: {0}")]
    Prompt(String),
}

/// Errors from the persisted document index and the embedding service.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Index file could not be opened.
    #[error("failed to open index at {path}: {message}")]
    Open {
        /// Index file path.
        path: String,
        /// Failure detail.
        message: String,
    },

    /// A similarity query failed.
    #[error("index query failed: {0}")]
    Query(String),

    /// The query could not be embedded.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Stored vectors do not match the query vector.
    #[error("dimension mismatch: index has {stored}, query has {query}")]
    DimensionMismatch {
        /// Stored embedding dimension.
        stored: usize,
        /// Query embedding dimension.
        query: usize,
    },

    /// Underlying `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors from connecting to or talking with remote tool servers.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Connecting to or enumerating an endpoint failed.
    #[error("failed to connect to {endpoint}: {message}")]
    Connect {
        /// Normalized endpoint URL.
        endpoint: String,
        /// Failure detail.
        message: String,
    },

    /// The endpoint did not answer within the connect timeout.
    #[error("timed out connecting to {endpoint} after {seconds}s")]
    Timeout {
        /// Normalized endpoint URL.
        endpoint: String,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// No endpoint is connected.
    #[error("no remote tool server connected")]
    NoConnection,
}

/// Errors from CLI command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command execution failed.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output format error: {0}")]
    OutputFormat(String),
}
