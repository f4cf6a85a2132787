//! ShopDesk configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShopDeskError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopDeskConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub returns: ReturnsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl ShopDeskConfig {
    /// Load config from `SHOPDESK_CONFIG` or the default path (~/.shopdesk/config.toml).
    pub fn load() -> Result<Self> {
        let path = std::env::var("SHOPDESK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShopDeskError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ShopDeskError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a component misbehave at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.target_tokens == 0 {
            return Err(ShopDeskError::Config("ingest.target_tokens must be > 0".into()));
        }
        if self.ingest.batch_size == 0 {
            return Err(ShopDeskError::Config("ingest.batch_size must be > 0".into()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ShopDeskError::Config("llm.temperature must be within 0.0..=2.0".into()));
        }
        match self.search.backend.as_str() {
            "memory" | "azure" => Ok(()),
            other => Err(ShopDeskError::Config(format!("Unknown search backend: {other}"))),
        }
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ShopDeskError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the ShopDesk home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shopdesk")
    }
}

/// Expand `~` in a configured path.
pub fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

/// Hosted LLM configuration (chat + embeddings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Registry name ("openai", "azure", "ollama", ...) or "custom:<url>".
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Chat model (deployment name for Azure).
    #[serde(default = "default_model")]
    pub model: String,
    /// Embedding model (deployment name for Azure).
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    /// Overrides the registry base URL when set.
    #[serde(default)]
    pub endpoint: String,
    /// Falls back to the registry's env variables when empty.
    #[serde(default)]
    pub api_key: String,
    /// Azure OpenAI `api-version` query parameter.
    #[serde(default = "default_openai_api_version")]
    pub api_version: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String { "openai".into() }
fn default_model() -> String { "gpt-4o".into() }
fn default_embedding_model() -> String { "text-embedding-ada-002".into() }
fn default_embedding_dimensions() -> usize { 1536 }
fn default_openai_api_version() -> String { "2024-02-01".into() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 800 }
fn default_timeout_secs() -> u64 { 60 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_openai_api_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Search index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// "memory" (JSON files under `data_dir`) or "azure" (Azure AI Search REST).
    #[serde(default = "default_search_backend")]
    pub backend: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_search_api_version")]
    pub api_version: String,
    #[serde(default = "default_search_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub indexes: IndexNames,
}

fn default_search_backend() -> String { "memory".into() }
fn default_search_api_version() -> String { "2023-11-01".into() }
fn default_search_data_dir() -> String { "~/.shopdesk/index".into() }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: default_search_backend(),
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_search_api_version(),
            data_dir: default_search_data_dir(),
            indexes: IndexNames::default(),
        }
    }
}

/// Names of the five indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNames {
    #[serde(default = "default_documents_index")]
    pub documents: String,
    #[serde(default = "default_orders_index")]
    pub orders: String,
    #[serde(default = "default_customers_index")]
    pub customers: String,
    #[serde(default = "default_products_index")]
    pub products: String,
    #[serde(default = "default_returns_index")]
    pub returns: String,
}

fn default_documents_index() -> String { "ecommerce-documents".into() }
fn default_orders_index() -> String { "ecommerce-orders".into() }
fn default_customers_index() -> String { "ecommerce-customers".into() }
fn default_products_index() -> String { "ecommerce-products".into() }
fn default_returns_index() -> String { "ecommerce-returns".into() }

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            documents: default_documents_index(),
            orders: default_orders_index(),
            customers: default_customers_index(),
            products: default_products_index(),
            returns: default_returns_index(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Logical folder uploaded documents go into.
    #[serde(default = "default_storage_folder")]
    pub folder: String,
    /// Public URL prefix; `file://` URLs are returned when empty.
    #[serde(default)]
    pub public_base_url: String,
}

fn default_storage_root() -> String { "~/.shopdesk/files".into() }
fn default_storage_folder() -> String { "pdfs".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            folder: default_storage_folder(),
            public_base_url: String::new(),
        }
    }
}

/// Document ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_target_tokens")]
    pub target_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
    /// Normalized text shorter than this is treated as image-only / empty.
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Embedding requests in flight per ingestion (1 = sequential).
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,
}

fn default_target_tokens() -> usize { 500 }
fn default_overlap_tokens() -> usize { 50 }
fn default_min_text_chars() -> usize { 10 }
fn default_batch_size() -> usize { 100 }
fn default_embedding_concurrency() -> usize { 1 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            target_tokens: default_target_tokens(),
            overlap_tokens: default_overlap_tokens(),
            min_text_chars: default_min_text_chars(),
            batch_size: default_batch_size(),
            embedding_concurrency: default_embedding_concurrency(),
        }
    }
}

/// Return eligibility configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsConfig {
    #[serde(default = "default_return_window_days")]
    pub return_window_days: i64,
    #[serde(default = "default_policy_query")]
    pub policy_query: String,
    #[serde(default = "default_policy_top")]
    pub policy_top: usize,
    #[serde(default = "default_decision_temperature")]
    pub temperature: f32,
    #[serde(default = "default_decision_max_tokens")]
    pub max_tokens: u32,
}

fn default_return_window_days() -> i64 { 30 }
fn default_policy_query() -> String { "return policy eligibility requirements".into() }
fn default_policy_top() -> usize { 2 }
fn default_decision_temperature() -> f32 { 0.3 }
fn default_decision_max_tokens() -> u32 { 500 }

impl Default for ReturnsConfig {
    fn default() -> Self {
        Self {
            return_window_days: default_return_window_days(),
            policy_query: default_policy_query(),
            policy_top: default_policy_top(),
            temperature: default_decision_temperature(),
            max_tokens: default_decision_max_tokens(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// When set, every route except `/health` requires `X-Api-Key`.
    #[serde(default)]
    pub api_key: String,
}

fn default_port() -> u16 { 3000 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            api_key: String::new(),
        }
    }
}

/// Order/return database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.shopdesk/shopdesk.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShopDeskConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert!((config.llm.temperature - 0.7).abs() < 0.01);
        assert_eq!(config.llm.max_tokens, 800);
        assert_eq!(config.ingest.target_tokens, 500);
        assert_eq!(config.ingest.overlap_tokens, 50);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.returns.return_window_days, 30);
        assert_eq!(config.storage.folder, "pdfs");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [llm]
            provider = "azure"
            model = "gpt-4o-deploy"
            endpoint = "https://shop.openai.azure.com"

            [search]
            backend = "azure"
            endpoint = "https://shop.search.windows.net"

            [ingest]
            target_tokens = 300
            overlap_tokens = 30
        "#;

        let config = ShopDeskConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.llm.provider, "azure");
        assert_eq!(config.llm.model, "gpt-4o-deploy");
        assert_eq!(config.search.backend, "azure");
        assert_eq!(config.ingest.target_tokens, 300);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.search.indexes.orders, "ecommerce-orders");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config = ShopDeskConfig::from_toml("").unwrap();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.search.backend, "memory");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ShopDeskConfig::from_toml("[ingest]\ntarget_tokens = 0").is_err());
        assert!(ShopDeskConfig::from_toml("[search]\nbackend = \"solr\"").is_err());
        assert!(ShopDeskConfig::from_toml("[llm]\ntemperature = 3.5").is_err());
    }

    #[test]
    fn test_home_dir() {
        let home = ShopDeskConfig::home_dir();
        assert!(home.to_string_lossy().contains("shopdesk"));
    }
}
