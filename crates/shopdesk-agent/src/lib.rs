//! # ShopDesk Agent
//! The assistant core: chat answers grounded in search results, and return
//! decisions grounded in policy documents.
//!
//! ## Flows
//! - **Chat**: [`classifier`] → [`retriever`] → [`answer`]
//! - **Orders**: [`orders::OrderService`] assigns ids and defaults
//! - **Returns**: order lookup → [`returns::EligibilityEvaluator`] → return record
//! - **Ingestion**: delegated to [`shopdesk_knowledge::IngestPipeline`]

pub mod answer;
pub mod chat;
pub mod classifier;
pub mod orders;
pub mod retriever;
pub mod returns;

use std::sync::Arc;

use shopdesk_core::config::{ShopDeskConfig, expand_path};
use shopdesk_core::error::Result;
use shopdesk_core::traits::{ChatProvider, EmbeddingProvider, FileStorage, SearchIndexes};
use shopdesk_core::types::{CompletionParams, SearchOptions, SearchResults};
use shopdesk_db::ShopDb;
use shopdesk_knowledge::{IngestPipeline, LocalFileStorage};

pub use answer::AnswerGenerator;
pub use chat::{ChatReply, ChatService};
pub use classifier::{Classification, Domain, QueryClassifier};
pub use orders::{NewOrder, OrderService};
pub use retriever::{ContextRetriever, PolicyRetriever};
pub use returns::{EligibilityEvaluator, ReturnOutcome, ReturnService};

/// Everything a front end (HTTP gateway, CLI) needs, wired from one config.
pub struct ShopAssistant {
    pub chat: ChatService,
    pub orders: OrderService,
    pub returns: ReturnService,
    pub ingest: IngestPipeline,
    pub db: Arc<ShopDb>,
    pub indexes: SearchIndexes,
    pub storage: Arc<dyn FileStorage>,
    pub folder: String,
}

impl ShopAssistant {
    /// Build providers, indexes, storage and the database from config.
    pub fn from_config(config: &ShopDeskConfig) -> Result<Self> {
        let provider = shopdesk_providers::create_provider(&config.llm)?;
        let indexes = shopdesk_search::create_indexes(&config.search)?;
        let db = Arc::new(ShopDb::open(&expand_path(&config.database.path))?);
        let storage = Arc::new(LocalFileStorage::from_config(&config.storage));
        tracing::info!(
            "🛍️ ShopDesk assistant ready: llm={} search={} db={}",
            config.llm.provider,
            config.search.backend,
            config.database.path
        );
        Self::from_parts(provider.clone(), provider, indexes, db, storage, config)
    }

    /// Wire the services from already-built collaborators.
    pub fn from_parts(
        chat: Arc<dyn ChatProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        indexes: SearchIndexes,
        db: Arc<ShopDb>,
        storage: Arc<dyn FileStorage>,
        config: &ShopDeskConfig,
    ) -> Result<Self> {
        let policy = PolicyRetriever::new(indexes.documents.clone(), embedder.clone());
        let params = CompletionParams {
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        };
        let chat_service = ChatService::new(
            QueryClassifier::new()?,
            ContextRetriever::new(indexes.clone(), policy.clone()),
            AnswerGenerator::new(chat.clone(), params),
        );
        let evaluator = EligibilityEvaluator::new(chat, policy, config.returns.clone());
        let returns = ReturnService::new(db.clone(), db.clone(), evaluator);
        let ingest = IngestPipeline::new(
            storage.clone(),
            indexes.documents.clone(),
            embedder,
            config.ingest.clone(),
            &config.storage.folder,
        );
        Ok(Self {
            chat: chat_service,
            orders: OrderService::new(db.clone()),
            returns,
            ingest,
            db,
            indexes,
            storage,
            folder: config.storage.folder.clone(),
        })
    }

    /// Names of the uploaded source files.
    pub async fn list_documents(&self) -> Result<Vec<String>> {
        self.storage.list(&self.folder).await
    }

    /// Indexed chunk records, vectors excluded.
    pub async fn search_documents(&self, text: &str, top: usize) -> Result<SearchResults> {
        let text = if text.trim().is_empty() { "*" } else { text };
        let opts = SearchOptions::top(top).with_count();
        let mut results = self.indexes.documents.query(text, &opts).await?;
        for record in &mut results.records {
            if let Some(obj) = record.as_object_mut() {
                obj.remove(shopdesk_search::CONTENT_VECTOR_FIELD);
            }
        }
        Ok(results)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChat, FakeEmbedder};
    use serde_json::json;
    use shopdesk_core::traits::SearchIndex;
    use shopdesk_search::MemoryIndex;

    fn assistant(documents: Arc<MemoryIndex>) -> ShopAssistant {
        let indexes = SearchIndexes {
            documents,
            orders: Arc::new(MemoryIndex::new("orders")),
            customers: Arc::new(MemoryIndex::new("customers")),
            products: Arc::new(MemoryIndex::new("products")),
            returns: Arc::new(MemoryIndex::new("returns")),
        };
        let root = std::env::temp_dir().join(format!("shopdesk-agent-{}", std::process::id()));
        ShopAssistant::from_parts(
            Arc::new(FakeChat::replying(&["Hello!"])),
            Arc::new(FakeEmbedder::ok()),
            indexes,
            Arc::new(ShopDb::open_in_memory().unwrap()),
            Arc::new(LocalFileStorage::new(&root)),
            &ShopDeskConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_documents_hides_vectors() {
        let docs = Arc::new(MemoryIndex::new("documents"));
        docs.upload_batch(&[json!({"id": "d_chunk_0", "content": "hello", "contentVector": [1.0, 0.0, 0.0]})])
            .await
            .unwrap();
        let a = assistant(docs);
        let res = a.search_documents("", 50).await.unwrap();
        assert_eq!(res.count, Some(1));
        assert!(res.records[0].get("contentVector").is_none());
        assert_eq!(res.records[0]["content"], "hello");
    }

    #[tokio::test]
    async fn test_chat_wired() {
        let a = assistant(Arc::new(MemoryIndex::new("documents")));
        let reply = a.chat.handle("hi there").await.unwrap();
        assert_eq!(reply.response, "Hello!");
        assert!(reply.domains.is_empty());
    }
}
