//! Managed search index trait.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{IndexSchema, SearchOptions, SearchResults, VectorOptions};

/// One named search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Upload (upsert) a batch of records keyed by their `id` field.
    async fn upload_batch(&self, records: &[Value]) -> Result<()>;

    /// Keyword / filter query. `text == "*"` matches every record.
    async fn query(&self, text: &str, options: &SearchOptions) -> Result<SearchResults>;

    /// Similarity query with a precomputed embedding.
    async fn vector_query(&self, vector: &[f32], options: &VectorOptions) -> Result<SearchResults>;

    /// Create the index if it does not exist yet. Idempotent.
    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()>;
}

/// The five indexes the assistant reads from.
#[derive(Clone)]
pub struct SearchIndexes {
    pub documents: Arc<dyn SearchIndex>,
    pub orders: Arc<dyn SearchIndex>,
    pub customers: Arc<dyn SearchIndex>,
    pub products: Arc<dyn SearchIndex>,
    pub returns: Arc<dyn SearchIndex>,
}
