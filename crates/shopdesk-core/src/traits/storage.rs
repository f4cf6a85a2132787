//! Durable file storage trait.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `bytes` as `folder/name` and return a stable retrieval URL.
    async fn put(&self, name: &str, bytes: &[u8], folder: &str) -> Result<String>;

    /// Names of the files stored in `folder`, sorted.
    async fn list(&self, folder: &str) -> Result<Vec<String>>;
}
