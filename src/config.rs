//! Application configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! Validation never fails: implausible values are logged as warnings, recorded
//! on the [`Settings`], and replaced with their defaults where a default exists.
//!
//! [`ConfigProvider`] owns the lazily-built [`Settings`] for the whole process.
//! It is constructed at the entry point and passed down by reference.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::error::ConfigError;
use crate::mcp::endpoint::discover_endpoints;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4.1";
/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default index file path.
pub const DEFAULT_INDEX_PATH: &str = "./vectordb.sqlite3";
/// Default collection identifier inside the index.
pub const DEFAULT_COLLECTION: &str = "documents";
/// Default reasoning-loop iteration cap.
pub const DEFAULT_ITERATION_LIMIT: usize = 25;
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default per-endpoint connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Accepted iteration limits.
const ITERATION_LIMIT_RANGE: std::ops::RangeInclusive<usize> = 1..=100;
/// Accepted temperatures.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;
/// Prefix expected on `OpenAI` API keys.
const CREDENTIAL_PREFIX: &str = "sk-";

/// Checks an iteration limit given explicitly on the command line.
///
/// Unlike environment values, a flag outside the accepted range is an error
/// rather than a silent fallback.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] when `n` is outside 1 to 100.
pub fn validate_iteration_limit(n: usize) -> Result<usize, ConfigError> {
    if ITERATION_LIMIT_RANGE.contains(&n) {
        Ok(n)
    } else {
        Err(ConfigError::InvalidValue {
            key: "--iteration-limit".to_string(),
            message: format!(
                "{n} is outside {}..={}",
                ITERATION_LIMIT_RANGE.start(),
                ITERATION_LIMIT_RANGE.end()
            ),
        })
    }
}

/// Environment variable names.
pub mod env {
    /// API credential.
    pub const API_KEY: &str = "OPENAI_API_KEY";
    /// API base URL override.
    pub const BASE_URL: &str = "OPENAI_BASE_URL";
    /// Comma-separated remote tool server endpoints.
    pub const SERVER_URLS: &str = "MCP_SERVER_URLS";
    /// Chat model.
    pub const MODEL: &str = "OPENAI_MODEL";
    /// Embedding model.
    pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
    /// Index file path.
    pub const INDEX_PATH: &str = "VECTORDB_PATH";
    /// Collection identifier.
    pub const COLLECTION: &str = "VECTORDB_COLLECTION";
    /// Reasoning-loop iteration cap.
    pub const ITERATION_LIMIT: &str = "RECURSION_LIMIT";
    /// Sampling temperature.
    pub const TEMPERATURE: &str = "TEMPERATURE";
    /// Per-endpoint connect timeout in seconds.
    pub const CONNECT_TIMEOUT: &str = "MCP_CONNECT_TIMEOUT_SECS";
    /// Prompt template directory.
    pub const PROMPT_DIR: &str = "DOCQA_PROMPT_DIR";
}

/// A non-fatal problem found while building [`Settings`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigWarning {
    /// No API credential is set.
    MissingCredential,
    /// The API credential does not look like an `OpenAI` key.
    MalformedCredential,
    /// The index file does not exist.
    MissingIndex {
        /// Configured path.
        path: PathBuf,
    },
    /// The iteration limit is outside the accepted range.
    IterationLimitOutOfRange {
        /// Rejected value.
        value: usize,
    },
    /// The temperature is outside the accepted range.
    TemperatureOutOfRange {
        /// Rejected value.
        value: f32,
    },
    /// A numeric override could not be parsed.
    MalformedNumber {
        /// Setting name.
        key: String,
        /// Raw value.
        value: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "{} is not set", env::API_KEY),
            Self::MalformedCredential => write!(
                f,
                "{} does not start with '{CREDENTIAL_PREFIX}'",
                env::API_KEY
            ),
            Self::MissingIndex { path } => write!(
                f,
                "index not found at {}; build it with your ingestion tooling first",
                path.display()
            ),
            Self::IterationLimitOutOfRange { value } => write!(
                f,
                "iteration limit {value} outside {}..={}, using {DEFAULT_ITERATION_LIMIT}",
                ITERATION_LIMIT_RANGE.start(),
                ITERATION_LIMIT_RANGE.end()
            ),
            Self::TemperatureOutOfRange { value } => write!(
                f,
                "temperature {value} outside {:.1}..={:.1}, using {DEFAULT_TEMPERATURE}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            ),
            Self::MalformedNumber { key, value } => {
                write!(f, "{key}={value:?} is not a number, using the default")
            }
        }
    }
}

/// Validated, immutable application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API credential, if any.
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Chat model.
    pub model: String,
    /// Embedding model.
    pub embedding_model: String,
    /// Index file path.
    pub index_path: PathBuf,
    /// Collection identifier inside the index.
    pub collection: String,
    /// Reasoning-loop iteration cap.
    pub iteration_limit: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Raw comma-separated endpoint list, parsed by [`discover_endpoints`].
    pub server_urls: String,
    /// Per-endpoint connect timeout.
    pub connect_timeout: Duration,
    /// Prompt template directory override.
    pub prompt_dir: Option<PathBuf>,
    warnings: Vec<ConfigWarning>,
}

/// Settings consumed by the document retriever.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalConfig {
    /// Index file path.
    pub index_path: PathBuf,
    /// Collection identifier.
    pub collection: String,
    /// Chat model used to write answers.
    pub model: String,
    /// Embedding model used for queries.
    pub embedding_model: String,
}

/// Settings consumed by the agent composer.
#[derive(Debug, Clone, Serialize)]
pub struct AgentBehavior {
    /// Chat model.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Reasoning-loop iteration cap.
    pub iteration_limit: usize,
    /// Whether remote tools should be attempted.
    pub include_remote: bool,
}

/// Human-facing configuration summary.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Whether an API credential is set.
    pub credential_set: bool,
    /// Whether the index file exists.
    pub index_found: bool,
    /// Index file path.
    pub index_path: PathBuf,
    /// Whether any remote endpoint is configured.
    pub remote_configured: bool,
    /// Parsed endpoint list.
    pub endpoints: Vec<String>,
    /// Chat model.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Reasoning-loop iteration cap.
    pub iteration_limit: usize,
    /// Warnings recorded at construction.
    pub warnings: Vec<String>,
}

impl Settings {
    /// Creates a new builder for `Settings`.
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Warnings recorded during construction.
    #[must_use]
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Parsed remote endpoint list, in configured order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<String> {
        discover_endpoints(&self.server_urls)
    }

    /// True iff at least one non-empty endpoint is configured.
    #[must_use]
    pub fn has_remote_servers(&self) -> bool {
        !self.endpoints().is_empty()
    }

    /// View used by the document retriever.
    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            index_path: self.index_path.clone(),
            collection: self.collection.clone(),
            model: self.model.clone(),
            embedding_model: self.embedding_model.clone(),
        }
    }

    /// View used by the agent composer.
    #[must_use]
    pub fn agent_behavior(&self) -> AgentBehavior {
        AgentBehavior {
            model: self.model.clone(),
            temperature: self.temperature,
            iteration_limit: self.iteration_limit,
            include_remote: self.has_remote_servers(),
        }
    }

    /// Summary for the `status` command.
    #[must_use]
    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            credential_set: self.api_key.as_deref().is_some_and(|k| !k.is_empty()),
            index_found: self.index_path.exists(),
            index_path: self.index_path.clone(),
            remote_configured: self.has_remote_servers(),
            endpoints: self.endpoints(),
            model: self.model.clone(),
            temperature: self.temperature,
            iteration_limit: self.iteration_limit,
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A numeric setting as supplied, before validation.
#[derive(Debug, Clone)]
enum RawNumber<T> {
    Parsed(T),
    Malformed(String),
}

impl<T: FromStr> RawNumber<T> {
    fn parse(raw: &str) -> Self {
        raw.trim()
            .parse()
            .map_or_else(|_| Self::Malformed(raw.to_string()), Self::Parsed)
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    index_path: Option<PathBuf>,
    collection: Option<String>,
    iteration_limit: Option<RawNumber<usize>>,
    temperature: Option<RawNumber<f32>>,
    server_urls: Option<String>,
    connect_timeout: Option<RawNumber<u64>>,
    prompt_dir: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(self) -> Self {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    /// Populates unset fields from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = text(env::API_KEY);
        }
        if self.base_url.is_none() {
            self.base_url = text(env::BASE_URL);
        }
        if self.model.is_none() {
            self.model = text(env::MODEL);
        }
        if self.embedding_model.is_none() {
            self.embedding_model = text(env::EMBEDDING_MODEL);
        }
        if self.index_path.is_none() {
            self.index_path = text(env::INDEX_PATH).map(PathBuf::from);
        }
        if self.collection.is_none() {
            self.collection = text(env::COLLECTION);
        }
        if self.iteration_limit.is_none() {
            self.iteration_limit = text(env::ITERATION_LIMIT).map(|v| RawNumber::parse(&v));
        }
        if self.temperature.is_none() {
            self.temperature = text(env::TEMPERATURE).map(|v| RawNumber::parse(&v));
        }
        if self.server_urls.is_none() {
            self.server_urls = lookup(env::SERVER_URLS);
        }
        if self.connect_timeout.is_none() {
            self.connect_timeout = text(env::CONNECT_TIMEOUT).map(|v| RawNumber::parse(&v));
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = text(env::PROMPT_DIR).map(PathBuf::from);
        }
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the index file path.
    #[must_use]
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Sets the collection identifier.
    #[must_use]
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn iteration_limit(mut self, n: usize) -> Self {
        self.iteration_limit = Some(RawNumber::Parsed(n));
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(RawNumber::Parsed(t));
        self
    }

    /// Sets the comma-separated endpoint list.
    #[must_use]
    pub fn server_urls(mut self, urls: impl Into<String>) -> Self {
        self.server_urls = Some(urls.into());
        self
    }

    /// Sets the per-endpoint connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(RawNumber::Parsed(timeout.as_secs()));
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds and validates the [`Settings`].
    ///
    /// Every warning is logged once here and kept on the result.
    #[must_use]
    pub fn build(self) -> Settings {
        let mut warnings = Vec::new();

        match self.api_key.as_deref() {
            None | Some("") => warnings.push(ConfigWarning::MissingCredential),
            Some(key) if !key.starts_with(CREDENTIAL_PREFIX) => {
                warnings.push(ConfigWarning::MalformedCredential);
            }
            Some(_) => {}
        }

        let index_path = self
            .index_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH));
        if !index_path.exists() {
            warnings.push(ConfigWarning::MissingIndex {
                path: index_path.clone(),
            });
        }

        let iteration_limit = match resolve(
            self.iteration_limit,
            env::ITERATION_LIMIT,
            DEFAULT_ITERATION_LIMIT,
            &mut warnings,
        ) {
            n if ITERATION_LIMIT_RANGE.contains(&n) => n,
            n => {
                warnings.push(ConfigWarning::IterationLimitOutOfRange { value: n });
                DEFAULT_ITERATION_LIMIT
            }
        };

        let temperature = match resolve(
            self.temperature,
            env::TEMPERATURE,
            DEFAULT_TEMPERATURE,
            &mut warnings,
        ) {
            t if TEMPERATURE_RANGE.contains(&t) => t,
            t => {
                warnings.push(ConfigWarning::TemperatureOutOfRange { value: t });
                DEFAULT_TEMPERATURE
            }
        };

        let connect_timeout = Duration::from_secs(resolve(
            self.connect_timeout,
            env::CONNECT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT_SECS,
            &mut warnings,
        ));

        for warning in &warnings {
            warn!("{warning}");
        }

        Settings {
            api_key: self.api_key.filter(|k| !k.is_empty()),
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            index_path,
            collection: self
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            iteration_limit,
            temperature,
            server_urls: self.server_urls.unwrap_or_default(),
            connect_timeout,
            prompt_dir: self.prompt_dir,
            warnings,
        }
    }
}

/// Resolves a raw number to its value, recording a warning and using the
/// default when it was malformed.
fn resolve<T: Copy>(
    raw: Option<RawNumber<T>>,
    key: &str,
    default: T,
    warnings: &mut Vec<ConfigWarning>,
) -> T {
    match raw {
        None => default,
        Some(RawNumber::Parsed(value)) => value,
        Some(RawNumber::Malformed(value)) => {
            warnings.push(ConfigWarning::MalformedNumber {
                key: key.to_string(),
                value,
            });
            default
        }
    }
}

type SettingsSource = Box<dyn Fn() -> SettingsBuilder + Send + Sync>;

/// Process-wide settings holder.
///
/// Builds [`Settings`] on the first [`get_config`](Self::get_config) call and
/// hands out the same value afterwards. Nothing mutates it after that.
pub struct ConfigProvider {
    source: SettingsSource,
    settings: OnceLock<Settings>,
}

impl ConfigProvider {
    /// Provider that reads the environment on first access.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_source(|| SettingsBuilder::new().from_env())
    }

    /// Provider that builds from the given builder on first access.
    #[must_use]
    pub fn from_builder(builder: SettingsBuilder) -> Self {
        Self::with_source(move || builder.clone())
    }

    fn with_source(source: impl Fn() -> SettingsBuilder + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
            settings: OnceLock::new(),
        }
    }

    /// Returns the settings, building and validating them on first call.
    pub fn get_config(&self) -> &Settings {
        self.settings.get_or_init(|| (self.source)().build())
    }

    /// Whether the settings have been built yet.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.settings.get().is_some()
    }

    /// Convenience for the configured prompt directory.
    #[must_use]
    pub fn prompt_dir(&self) -> Option<&Path> {
        self.get_config().prompt_dir.as_deref()
    }
}

impl fmt::Debug for ConfigProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigProvider")
            .field("settings", &self.settings.get())
            .finish_non_exhaustive()
    }
}
