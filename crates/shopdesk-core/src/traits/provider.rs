//! Hosted LLM traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CompletionParams, Message};

/// Chat-completion service.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name for logs (e.g. "openai", "azure").
    fn name(&self) -> &str;

    /// Run one completion. `Ok(None)` means the service answered without content.
    async fn complete(&self, messages: &[Message], params: &CompletionParams)
    -> Result<Option<String>>;
}

/// Embedding service. May fail independently of chat completion.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fixed vector dimension produced by [`embed`](Self::embed).
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
