//! In-process search index.
//! Records kept in memory, optionally persisted as one JSON file per index.
//! Used for local development and as the test double for Azure AI Search.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::SearchIndex;
use shopdesk_core::types::{IndexSchema, SearchMode, SearchOptions, SearchResults, VectorOptions};

use crate::filter::Filter;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "for", "from", "how", "i", "in",
    "is", "it", "me", "my", "of", "on", "or", "the", "to", "what", "when", "where", "which", "with",
    "you", "your",
];

/// Rows in insertion order plus an `id` → row position map.
#[derive(Default)]
struct Records {
    rows: Vec<Value>,
    by_id: HashMap<String, usize>,
}

impl Records {
    fn from_rows(rows: Vec<Value>) -> Self {
        let by_id = rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.get("id").and_then(Value::as_str).map(|id| (id.to_string(), i)))
            .collect();
        Self { rows, by_id }
    }

    /// Replace the row with the same id, or append.
    fn upsert(&mut self, id: &str, record: Value) {
        match self.by_id.get(id) {
            Some(&pos) => self.rows[pos] = record,
            None => {
                self.by_id.insert(id.to_string(), self.rows.len());
                self.rows.push(record);
            }
        }
    }
}

pub struct MemoryIndex {
    name: String,
    records: RwLock<Records>,
    schema: RwLock<Option<IndexSchema>>,
    path: Option<PathBuf>,
}

impl MemoryIndex {
    /// Non-persistent index.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: RwLock::new(Records::default()),
            schema: RwLock::new(None),
            path: None,
        }
    }

    /// Index backed by `{dir}/{name}.json`, loaded if it exists.
    pub fn open(name: &str, dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.json"));
        let records = if path.exists() {
            let json = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Vec<Value>>(&json).map_err(|e| {
                ShopDeskError::Search(format!("Corrupt index file {}: {e}", path.display()))
            })?
        } else {
            Vec::new()
        };
        tracing::debug!("📂 Index '{name}' loaded: {} records", records.len());
        Ok(Self {
            name: name.to_string(),
            records: RwLock::new(Records::from_rows(records)),
            schema: RwLock::new(None),
            path: Some(path),
        })
    }

    /// Seed with records (tests, fixtures).
    pub fn with_records(name: &str, records: Vec<Value>) -> Self {
        let index = Self::new(name);
        if let Ok(mut guard) = index.records.write() {
            *guard = Records::from_rows(records);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn save(&self, records: &[Value]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(path, json)?;
        tracing::debug!("💾 Saved {} records to {}", records.len(), path.display());
        Ok(())
    }

    fn read_records(&self) -> Result<std::sync::RwLockReadGuard<'_, Records>> {
        self.records
            .read()
            .map_err(|_| ShopDeskError::Search(format!("Index '{}' lock poisoned", self.name)))
    }
}

/// Lowercased query terms without stopwords.
fn terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// All string and numeric leaves of a record, lowercased.
fn searchable_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(&s.to_lowercase());
            out.push(' ');
        }
        Value::Number(n) if !n.is_f64() => {
            out.push_str(&n.to_string());
            out.push(' ');
        }
        Value::Object(map) => map.values().for_each(|v| searchable_text(v, out)),
        Value::Array(items) if items.iter().all(Value::is_number) => {}
        Value::Array(items) => items.iter().for_each(|v| searchable_text(v, out)),
        _ => {}
    }
}

/// Number of query terms the record contains, or `None` when it does not qualify.
fn score(record: &Value, terms: &[String], mode: SearchMode) -> Option<usize> {
    if terms.is_empty() {
        return Some(0);
    }
    let mut haystack = String::new();
    searchable_text(record, &mut haystack);
    let words: HashSet<&str> = haystack
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let hits = terms.iter().filter(|t| words.contains(t.as_str())).count();
    match mode {
        SearchMode::Any if hits > 0 => Some(hits),
        SearchMode::All if hits == terms.len() => Some(hits),
        _ => None,
    }
}

fn project(record: &Value, select: &[String]) -> Value {
    if select.is_empty() {
        return record.clone();
    }
    let mut out = serde_json::Map::new();
    for field in select {
        if let Some(v) = record.get(field) {
            out.insert(field.clone(), v.clone());
        }
    }
    Value::Object(out)
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

fn as_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload_batch(&self, batch: &[Value]) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| ShopDeskError::Search(format!("Index '{}' lock poisoned", self.name)))?;
        for record in batch {
            let id = record
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ShopDeskError::Search("Record is missing string 'id'".into()))?;
            records.upsert(id, record.clone());
        }
        self.save(&records.rows)?;
        tracing::debug!("📤 {} ← {} records", self.name, batch.len());
        Ok(())
    }

    async fn query(&self, text: &str, options: &SearchOptions) -> Result<SearchResults> {
        let filter = options.filter.as_deref().map(Filter::parse).transpose()?;
        let terms = if text.trim() == "*" { Vec::new() } else { terms(text) };
        let records = self.read_records()?;

        let mut hits: Vec<(usize, &Value)> = records
            .rows
            .iter()
            .filter(|r| filter.as_ref().is_none_or(|f| f.matches(r)))
            .filter_map(|r| score(r, &terms, options.search_mode).map(|s| (s, r)))
            .collect();
        // stable: equal scores keep insertion order
        hits.sort_by(|a, b| b.0.cmp(&a.0));

        let count = options.include_count.then_some(hits.len() as u64);
        let records = hits
            .into_iter()
            .take(options.top)
            .map(|(_, r)| project(r, &options.select))
            .collect();
        Ok(SearchResults { records, count })
    }

    async fn vector_query(&self, vector: &[f32], options: &VectorOptions) -> Result<SearchResults> {
        let filter = options.filter.as_deref().map(Filter::parse).transpose()?;
        let records = self.read_records()?;

        let mut scored: Vec<(f32, &Value)> = records
            .rows
            .iter()
            .filter(|r| filter.as_ref().is_none_or(|f| f.matches(r)))
            .filter_map(|r| {
                let stored = r.get(&options.field).and_then(as_vector)?;
                (stored.len() == vector.len()).then(|| (cosine(vector, &stored), r))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let records = scored
            .into_iter()
            .take(options.top)
            .map(|(_, r)| {
                let mut r = r.clone();
                if let Some(obj) = r.as_object_mut() {
                    obj.remove(&options.field);
                }
                r
            })
            .collect();
        Ok(SearchResults { records, count: None })
    }

    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        let mut current = self
            .schema
            .write()
            .map_err(|_| ShopDeskError::Search(format!("Index '{}' lock poisoned", self.name)))?;
        if current.is_none() {
            tracing::info!("🗂️ Index '{}' ready ({} fields)", self.name, schema.fields.len());
            *current = Some(schema.clone());
        }
        Ok(())
    }
}
