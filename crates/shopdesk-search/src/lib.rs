//! # ShopDesk Search
//!
//! Index backends behind [`SearchIndex`]:
//! - `azure`: Azure AI Search over REST
//! - `memory`: in-process, persisted as JSON under `search.data_dir`

pub mod azure;
pub mod filter;
pub mod memory;
pub mod schema;

use std::sync::Arc;

use shopdesk_core::config::{SearchConfig, expand_path};
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::{SearchIndex, SearchIndexes};

pub use azure::AzureSearchIndex;
pub use memory::MemoryIndex;
pub use schema::{CONTENT_VECTOR_FIELD, documents_schema};

/// Open one index on the configured backend.
pub fn create_index(name: &str, config: &SearchConfig) -> Result<Arc<dyn SearchIndex>> {
    match config.backend.as_str() {
        "memory" => {
            let dir = expand_path(&config.data_dir);
            Ok(Arc::new(MemoryIndex::open(name, &dir)?))
        }
        "azure" => Ok(Arc::new(AzureSearchIndex::new(name, config)?)),
        other => Err(ShopDeskError::Config(format!("Unknown search backend: {other}"))),
    }
}

/// Open all five indexes.
pub fn create_indexes(config: &SearchConfig) -> Result<SearchIndexes> {
    let names = &config.indexes;
    let indexes = SearchIndexes {
        documents: create_index(&names.documents, config)?,
        orders: create_index(&names.orders, config)?,
        customers: create_index(&names.customers, config)?,
        products: create_index(&names.products, config)?,
        returns: create_index(&names.returns, config)?,
    };
    tracing::info!("🔎 Search backend '{}' ready", config.backend);
    Ok(indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_indexes() {
        let dir = std::env::temp_dir().join(format!("shopdesk-search-{}", std::process::id()));
        let cfg = SearchConfig {
            data_dir: dir.to_string_lossy().into_owned(),
            ..Default::default()
        };
        let idx = create_indexes(&cfg).unwrap();
        assert_eq!(idx.orders.name(), "ecommerce-orders");
        assert_eq!(idx.documents.name(), "ecommerce-documents");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_backend() {
        let cfg = SearchConfig {
            backend: "elastic".into(),
            ..Default::default()
        };
        assert!(create_index("x", &cfg).is_err());
    }
}
