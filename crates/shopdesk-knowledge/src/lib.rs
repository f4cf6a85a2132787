//! # ShopDesk Knowledge
//!
//! Turns uploaded policy documents into searchable, embedded chunks.
//!
//! ## How it works
//! ```text
//! Admin uploads "return-policy.pdf"
//!   ↓
//! FileStorage.put(.., "pdfs")            → file URL
//!   ↓
//! TextExtractor (by extension) + normalize
//!   ↓
//! chunk(text, 500, 50)                   → ~500-word windows, 50 shared
//!   ↓
//! EmbeddingProvider.embed(chunk)         → contentVector (optional per chunk)
//!   ↓
//! SearchIndex.upload_batch(100 at a time) → "ecommerce-documents"
//!   ↓
//! Policy questions retrieve top chunks by vector similarity
//! ```

pub mod chunker;
pub mod extract;
pub mod pipeline;
pub mod storage;

pub use chunker::{ChunkerConfig, chunk};
pub use extract::{ExtractorRegistry, PdfExtractor, PlainTextExtractor, TextExtractor, normalize_text};
pub use pipeline::{IngestPipeline, IngestReport, IngestStatus, StepOutcome};
pub use storage::LocalFileStorage;
