//! Document ingestion pipeline.
//!
//! store → extract → normalize → chunk → embed → ensure index → upload.
//! Storing, extracting and chunking are fatal on failure. Embedding, index
//! creation and upload degrade: the report says what was left undone.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use shopdesk_core::config::IngestConfig;
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::{EmbeddingProvider, FileStorage, SearchIndex};
use shopdesk_core::types::{Chunk, IndexedDocumentRecord};
use shopdesk_search::documents_schema;

use crate::chunker::ChunkerConfig;
use crate::extract::{EXTRACTION_FAILED, ExtractorRegistry, normalize_text};

pub const NO_TEXT: &str = "No text content found in file. The file may be image-based or empty.";
pub const INDEX_FAILED: &str = "File uploaded to storage but failed to index in search";

/// Result of a best-effort step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Done,
    Degraded(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Indexed,
    PartiallyIndexed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub file_name: String,
    pub file_url: String,
    pub document_id: String,
    pub num_pages: usize,
    pub chunks: usize,
    pub indexed: usize,
    pub embeddings_generated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub status: IngestStatus,
}

impl IngestReport {
    pub fn message(&self) -> String {
        format!(
            "Document processed: {} chunks created and {} indexed",
            self.chunks, self.indexed
        )
    }
}

pub struct IngestPipeline {
    storage: Arc<dyn FileStorage>,
    index: Arc<dyn SearchIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractors: ExtractorRegistry,
    config: IngestConfig,
    folder: String,
}

/// Fresh document id: UUID v4 restricted to `[A-Za-z0-9_-]`.
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4()
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn FileStorage>,
        index: Arc<dyn SearchIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IngestConfig,
        folder: &str,
    ) -> Self {
        Self {
            storage,
            index,
            embedder,
            extractors: ExtractorRegistry::default(),
            config,
            folder: folder.to_string(),
        }
    }

    /// Replace the extractor registry (e.g. to add a DOCX extractor).
    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    /// Read a file from disk and ingest it under its own file name.
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ingest(&bytes, &file_name).await
    }

    pub async fn ingest(&self, bytes: &[u8], file_name: &str) -> Result<IngestReport> {
        let chunker = ChunkerConfig::from(&self.config);
        chunker.validate()?;
        if file_name.trim().is_empty() {
            return Err(ShopDeskError::InvalidInput("No file name provided".into()));
        }
        let extractor = self.extractors.for_file(file_name)?;
        tracing::info!("📄 Processing {file_name} ({} bytes)", bytes.len());

        let file_url = self.storage.put(file_name, bytes, &self.folder).await?;

        let extracted = extractor.extract(bytes).map_err(|e| match e {
            ShopDeskError::Extraction(msg) => ShopDeskError::Extraction(msg),
            other => ShopDeskError::Extraction(format!("{EXTRACTION_FAILED} ({other})")),
        })?;
        let text = normalize_text(&extracted.text);
        tracing::debug!("Extracted {} chars from {} pages", text.len(), extracted.num_pages);
        if text.chars().count() < self.config.min_text_chars {
            return Err(ShopDeskError::NoExtractableText(NO_TEXT.into()));
        }

        let chunks = chunker.chunk(&text);
        if chunks.is_empty() {
            return Err(ShopDeskError::Other(
                "Failed to create text chunks from document content".into(),
            ));
        }
        tracing::info!("✂️ {file_name}: {} chunks", chunks.len());

        let document_id = new_document_id();
        let embeddings = self.embed_all(&chunks).await;
        let embeddings_generated = embeddings.iter().filter(|e| e.is_some()).count();
        tracing::info!(
            "🧮 Generated {embeddings_generated}/{} embeddings",
            chunks.len()
        );

        let uploaded_at = chrono::Utc::now().to_rfc3339();
        let records: Vec<Value> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, content_vector)| {
                serde_json::to_value(IndexedDocumentRecord {
                    id: IndexedDocumentRecord::chunk_id(&document_id, chunk.index),
                    document_id: document_id.clone(),
                    file_name: file_name.to_string(),
                    file_url: file_url.clone(),
                    content: chunk.text.clone(),
                    chunk_index: chunk.index,
                    total_chunks: chunks.len(),
                    num_pages: extracted.num_pages,
                    uploaded_at: uploaded_at.clone(),
                    content_vector,
                })
            })
            .collect::<std::result::Result<_, _>>()?;

        if let StepOutcome::Degraded(reason) = self.ensure_index().await {
            tracing::warn!("⚠️ Index check failed, continuing: {reason}");
        }

        let (indexed, upload) = self.upload(&records).await;
        let (warning, status) = match upload {
            StepOutcome::Done => (None, IngestStatus::Indexed),
            StepOutcome::Degraded(reason) => {
                tracing::error!("❌ Indexing {file_name} failed: {reason}");
                (Some(INDEX_FAILED.to_string()), IngestStatus::PartiallyIndexed)
            }
        };

        let report = IngestReport {
            file_name: file_name.to_string(),
            file_url,
            document_id,
            num_pages: extracted.num_pages,
            chunks: chunks.len(),
            indexed,
            embeddings_generated,
            warning,
            status,
        };
        tracing::info!("✅ {file_name}: {}", report.message());
        Ok(report)
    }

    /// One embedding per chunk, in chunk order. Failures become `None`.
    async fn embed_all(&self, chunks: &[Chunk]) -> Vec<Option<Vec<f32>>> {
        let embedder = self.embedder.clone();
        stream::iter(chunks.iter().map(|c| (c.index, c.text.clone())).collect::<Vec<_>>())
            .map(move |(index, text)| {
                let embedder = embedder.clone();
                async move {
                    match embedder.embed(&text).await {
                        Ok(v) => Some(v),
                        Err(e) => {
                            tracing::warn!("⚠️ No embedding for chunk {index}: {e}");
                            None
                        }
                    }
                }
            })
            .buffered(self.config.embedding_concurrency.max(1))
            .collect()
            .await
    }

    async fn ensure_index(&self) -> StepOutcome {
        let schema = documents_schema(self.index.name(), self.embedder.dimensions());
        match self.index.ensure_index(&schema).await {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Degraded(e.to_string()),
        }
    }

    /// Upload in batches; returns records confirmed before any failure.
    async fn upload(&self, records: &[Value]) -> (usize, StepOutcome) {
        let mut indexed = 0;
        for batch in records.chunks(self.config.batch_size.max(1)) {
            if let Err(e) = self.index.upload_batch(batch).await {
                return (indexed, StepOutcome::Degraded(e.to_string()));
            }
            indexed += batch.len();
            tracing::debug!("Uploaded batch: {indexed}/{}", records.len());
        }
        (indexed, StepOutcome::Done)
    }
}
