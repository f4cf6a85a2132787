//! Local file storage.
//! Files land in `{root}/{folder}/{name}`; re-uploading a name overwrites it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use shopdesk_core::config::{StorageConfig, expand_path};
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::FileStorage;

pub struct LocalFileStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            public_base_url: String::new(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root: expand_path(&config.root),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, folder: &str, name: &str, path: &Path) -> String {
        if self.public_base_url.is_empty() {
            format!("file://{}", path.display())
        } else {
            format!("{}/{folder}/{name}", self.public_base_url)
        }
    }
}

/// Keep `[A-Za-z0-9._-]`, replace the rest with `_`, drop leading dots.
pub fn sanitize_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn put(&self, name: &str, bytes: &[u8], folder: &str) -> Result<String> {
        let safe_name = sanitize_name(name);
        let safe_folder = sanitize_name(folder);
        if safe_name.is_empty() {
            return Err(ShopDeskError::InvalidInput(format!("Invalid file name '{name}'")));
        }
        let dir = self.root.join(&safe_folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ShopDeskError::Storage(format!("Create {}: {e}", dir.display())))?;
        let path = dir.join(&safe_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ShopDeskError::Storage(format!("Write {}: {e}", path.display())))?;
        tracing::info!("💾 Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(self.url_for(&safe_folder, &safe_name, &path))
    }

    async fn list(&self, folder: &str) -> Result<Vec<String>> {
        let dir = self.root.join(sanitize_name(folder));
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| ShopDeskError::Storage(format!("List {}: {e}", dir.display())))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ShopDeskError::Storage(e.to_string()))?
        {
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
