//! Error types shared across the workspace.

/// Errors surfaced by ShopDesk components.
#[derive(Debug, thiserror::Error)]
pub enum ShopDeskError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("No extractable text: {0}")]
    NoExtractableText(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl ShopDeskError {
    /// Whether the error was caused by the caller's request rather than by
    /// ShopDesk or one of its collaborators.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::Extraction(_)
                | Self::NoExtractableText(_)
                | Self::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShopDeskError>;
