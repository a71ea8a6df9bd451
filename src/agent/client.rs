//! Provider factory.
//!
//! Components that hold a lazily-built model handle take a
//! [`ProviderFactory`] rather than a provider, so nothing talks to the SDK
//! until a handle is first needed.

use std::sync::Arc;

use crate::agent::provider::LlmProvider;
use crate::agent::providers::OpenAiProvider;
use crate::config::Settings;
use crate::error::AgentError;

/// Builds a model handle on demand.
pub type ProviderFactory = Arc<dyn Fn() -> Result<Arc<dyn LlmProvider>, AgentError> + Send + Sync>;

/// Creates the `OpenAI`-compatible provider for these settings.
#[must_use]
pub fn create_provider(settings: &Settings) -> Arc<dyn LlmProvider> {
    Arc::new(OpenAiProvider::new(settings))
}

/// Factory producing a fresh [`OpenAiProvider`] per call.
#[must_use]
pub fn openai_factory(settings: &Settings) -> ProviderFactory {
    let settings = settings.clone();
    Arc::new(move || Ok(create_provider(&settings)))
}

/// Factory that always hands out the same provider.
#[must_use]
pub fn shared_factory(provider: Arc<dyn LlmProvider>) -> ProviderFactory {
    Arc::new(move || Ok(Arc::clone(&provider)))
}
