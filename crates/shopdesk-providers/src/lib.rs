//! # ShopDesk Providers
//!
//! Hosted LLM clients for ShopDesk.
//!
//! All supported services (OpenAI, Azure OpenAI, Ollama, custom endpoints)
//! speak the OpenAI wire format and are handled by a single
//! `OpenAiCompatibleProvider`, which serves both chat completions and embeddings.

pub mod openai_compatible;
pub mod provider_registry;

use std::sync::Arc;

use shopdesk_core::config::LlmConfig;
use shopdesk_core::error::{Result, ShopDeskError};

pub use openai_compatible::OpenAiCompatibleProvider;

/// Create a provider from configuration.
///
/// `config.provider` is either a registry name or `custom:<base url>`.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<OpenAiCompatibleProvider>> {
    let provider = match config.provider.as_str() {
        other if other.starts_with("custom:") => {
            OpenAiCompatibleProvider::custom(other, config)?
        }
        name => {
            let registry = provider_registry::get_provider_config(name)
                .ok_or_else(|| ShopDeskError::ProviderNotFound(name.into()))?;
            OpenAiCompatibleProvider::from_registry(registry, config)?
        }
    };
    tracing::debug!("🔌 LLM provider '{}' ready", config.provider);
    Ok(Arc::new(provider))
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("custom");
    names
}
