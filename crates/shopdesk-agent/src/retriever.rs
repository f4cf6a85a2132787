//! Context retrieval.
//!
//! Fans a classified message out to the per-domain indexes and renders the
//! hits as labelled plain-text blocks for the answer prompt.

use serde_json::Value;
use std::sync::Arc;

use shopdesk_core::error::Result;
use shopdesk_core::traits::{EmbeddingProvider, SearchIndex, SearchIndexes};
use shopdesk_core::types::{SearchMode, SearchOptions, SearchResults, VectorOptions};
use shopdesk_search::CONTENT_VECTOR_FIELD;
use shopdesk_search::filter;

use crate::classifier::{Classification, Domain};

pub const POLICY_UNAVAILABLE: &str = "Unable to retrieve policy documents at this time.";

/// Similarity search over the documents index, with keyword fallback.
#[derive(Clone)]
pub struct PolicyRetriever {
    documents: Arc<dyn SearchIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl PolicyRetriever {
    pub fn new(documents: Arc<dyn SearchIndex>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { documents, embedder }
    }

    /// Embed `query` and return the `top` nearest chunks.
    pub async fn vector_search(&self, query: &str, top: usize) -> Result<Vec<Value>> {
        let vector = self.embedder.embed(query).await?;
        let results = self
            .documents
            .vector_query(&vector, &VectorOptions::new(CONTENT_VECTOR_FIELD, top))
            .await?;
        Ok(results.records)
    }

    pub async fn keyword_search(&self, query: &str, top: usize) -> Result<Vec<Value>> {
        let opts = SearchOptions::top(top).with_mode(SearchMode::Any);
        Ok(self.documents.query(query, &opts).await?.records)
    }

    /// Policy text for `query`. Never fails: vector search, then keyword
    /// search, then a fixed notice.
    pub async fn policy_context(&self, query: &str, top: usize) -> String {
        match self.vector_search(query, top).await {
            Ok(docs) => {
                tracing::debug!("📚 Policy context via vector search ({} docs)", docs.len());
                return join_contents(&docs);
            }
            Err(e) => tracing::warn!("⚠️ Vector search failed, trying keywords: {e}"),
        }
        match self.keyword_search(query, top).await {
            Ok(docs) => {
                tracing::debug!("📚 Policy context via keyword search ({} docs)", docs.len());
                join_contents(&docs)
            }
            Err(e) => {
                tracing::error!("❌ Keyword search also failed: {e}");
                POLICY_UNAVAILABLE.to_string()
            }
        }
    }
}

/// `content` of each record (or `text`, or the raw JSON), blank-line separated.
pub fn join_contents(records: &[Value]) -> String {
    records
        .iter()
        .map(|r| {
            r.get("content")
                .or_else(|| r.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| r.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn pretty_list(records: Vec<Value>) -> String {
    pretty(&Value::Array(records))
}

pub struct ContextRetriever {
    indexes: SearchIndexes,
    policy: PolicyRetriever,
    policy_top: usize,
}

impl ContextRetriever {
    pub fn new(indexes: SearchIndexes, policy: PolicyRetriever) -> Self {
        Self {
            indexes,
            policy,
            policy_top: 3,
        }
    }

    /// Build the context string for `message`. Empty when nothing was found.
    pub async fn retrieve(&self, message: &str, classification: &Classification) -> String {
        let plan = classification.retrieval_domains();
        let mut blocks = Vec::new();

        for domain in Domain::ALL.into_iter().filter(|d| plan.contains(d)) {
            let result = match domain {
                Domain::Policy => {
                    let ctx = self.policy.policy_context(message, self.policy_top).await;
                    Ok(vec![format!("Policy Documents:\n{ctx}")])
                }
                Domain::Order => self.order_blocks(message, classification).await,
                Domain::Customer => self.customer_blocks(message, classification).await,
                Domain::Product => {
                    self.free_text(&self.indexes.products, message, "Relevant Products:")
                        .await
                }
                Domain::Return => {
                    self.free_text(&self.indexes.returns, message, "Return Information:")
                        .await
                }
            };
            match result {
                Ok(mut b) => blocks.append(&mut b),
                Err(e) => tracing::warn!("⚠️ {} lookup skipped: {e}", domain.as_str()),
            }
        }

        let context = blocks.join("\n\n");
        tracing::debug!("🔍 Context: {} blocks, {} chars", blocks.len(), context.len());
        context
    }

    async fn search(
        &self,
        index: &Arc<dyn SearchIndex>,
        text: &str,
        opts: SearchOptions,
    ) -> Result<SearchResults> {
        index.query(text, &opts).await
    }

    async fn order_blocks(&self, message: &str, c: &Classification) -> Result<Vec<String>> {
        let orders = &self.indexes.orders;
        if let Some(id) = &c.entities.order_id {
            let opts = SearchOptions::top(1).with_filter(filter::eq("order_id", id));
            let res = self.search(orders, "*", opts).await?;
            return Ok(res
                .records
                .iter()
                .map(|r| format!("Order Information:\n{}", pretty(r)))
                .collect());
        }
        if message.to_lowercase().contains("pending") {
            let opts = SearchOptions::top(10)
                .with_filter(filter::any_of("status", &["Pending", "Processing"]))
                .with_count();
            let res = self.search(orders, "*", opts).await?;
            let total = res.count.unwrap_or(0);
            return Ok(vec![format!(
                "Pending Orders ({total} total):\n{}",
                pretty_list(res.records)
            )]);
        }
        Ok(vec![])
    }

    async fn customer_blocks(&self, message: &str, c: &Classification) -> Result<Vec<String>> {
        let customers = &self.indexes.customers;
        if let Some(id) = &c.entities.customer_id {
            let opts = SearchOptions::top(1).with_filter(filter::eq("customer_id", id));
            let res = self.search(customers, "*", opts).await?;
            return Ok(res
                .records
                .iter()
                .map(|r| format!("Customer Information:\n{}", pretty(r)))
                .collect());
        }
        if let Some(state) = &c.entities.region {
            let opts = SearchOptions::top(10)
                .with_filter(filter::eq("address_state", state))
                .with_count();
            let res = self.search(customers, "*", opts).await?;
            let total = res.count.unwrap_or(0);
            return Ok(vec![format!(
                "Customers in {state} ({total} total):\n{}",
                pretty_list(res.records)
            )]);
        }
        self.free_text(customers, message, "Relevant Customers:").await
    }

    async fn free_text(
        &self,
        index: &Arc<dyn SearchIndex>,
        message: &str,
        label: &str,
    ) -> Result<Vec<String>> {
        let opts = SearchOptions::top(5).with_mode(SearchMode::Any);
        let res = self.search(index, message, opts).await?;
        if res.records.is_empty() {
            return Ok(vec![]);
        }
        Ok(vec![format!("{label}\n{}", pretty_list(res.records))])
    }
}
