//! Records exchanged between ShopDesk components and its managed services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ─── Documents ───────────────────────────────────────────────────────────────

/// A contiguous slice of a document's normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Exact source slice `[start_offset, end_offset)`.
    pub text: String,
    /// Position within the document, starting at 0.
    pub index: usize,
    /// Byte offset of the first character in the normalized text.
    pub start_offset: usize,
    /// Byte offset one past the last character.
    pub end_offset: usize,
}

/// One chunk of an uploaded document as stored in the documents index.
///
/// Field names on the wire are fixed: consumers filter by them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedDocumentRecord {
    pub id: String,
    pub document_id: String,
    pub file_name: String,
    pub file_url: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub num_pages: usize,
    pub uploaded_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_vector: Option<Vec<f32>>,
}

impl IndexedDocumentRecord {
    /// Chunk-unique record id.
    pub fn chunk_id(document_id: &str, chunk_index: usize) -> String {
        format!("{document_id}_chunk_{chunk_index}")
    }
}

/// Plain text pulled out of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub num_pages: usize,
}

// ─── Orders & returns ────────────────────────────────────────────────────────

/// Order lifecycle state. Parsed case-insensitively; unknown values are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" | "canceled" => Self::Cancelled,
            "returned" => Self::Returned,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order as owned by the order-management collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: String,
    #[serde(default)]
    pub delivery_date: Option<String>,
    pub status: OrderStatus,
    pub total_amount: f64,
    #[serde(default)]
    pub items: Value,
    #[serde(default)]
    pub shipping_address: Value,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Partial update applied to an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
}

/// Return request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

/// Persisted return, created only after an eligible decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub return_id: String,
    pub order_id: String,
    pub customer_id: String,
    pub status: ReturnStatus,
    pub reason: String,
    #[serde(default)]
    pub items: Value,
    pub refund_amount: f64,
    pub restocking_fee: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Accept/reject verdict for a return request. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityDecision {
    #[serde(default)]
    pub eligible: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub refund_amount: f64,
    #[serde(default)]
    pub restocking_fee: f64,
}

impl EligibilityDecision {
    /// Safe default used when evaluation fails internally.
    pub fn internal_error() -> Self {
        Self {
            eligible: false,
            reason: "Error processing request".into(),
            message: "Unable to process return eligibility at this time".into(),
            refund_amount: 0.0,
            restocking_fee: 0.0,
        }
    }
}

// ─── LLM ─────────────────────────────────────────────────────────────────────

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Sampling parameters for one chat completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 800 }
    }
}

// ─── Search ──────────────────────────────────────────────────────────────────

/// How free-text terms combine in a keyword query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Any,
    All,
}

/// Options for a keyword / filter query. Text `"*"` matches everything.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// OData-style filter expression, e.g. `order_id eq 'ORD-2024-001'`.
    pub filter: Option<String>,
    pub top: usize,
    pub include_count: bool,
    pub search_mode: SearchMode,
    /// Fields to return; empty means all.
    pub select: Vec<String>,
}

impl SearchOptions {
    pub fn top(top: usize) -> Self {
        Self { top, ..Default::default() }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_count(mut self) -> Self {
        self.include_count = true;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            filter: None,
            top: 50,
            include_count: false,
            search_mode: SearchMode::Any,
            select: Vec::new(),
        }
    }
}

/// Options for a vector-similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorOptions {
    /// Vector field to compare against.
    pub field: String,
    pub top: usize,
    pub filter: Option<String>,
}

impl VectorOptions {
    pub fn new(field: impl Into<String>, top: usize) -> Self {
        Self { field: field.into(), top, filter: None }
    }
}

/// Records returned from a query plus the optional total match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub records: Vec<Value>,
    pub count: Option<u64>,
}

/// Field type in an index schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int32,
    Int64,
    Double,
    Boolean,
    DateTime,
    /// Float vector with the given number of dimensions.
    Vector(usize),
}

/// One field of an index schema.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexField {
    pub name: String,
    pub kind: FieldKind,
    pub key: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub sortable: bool,
}

impl IndexField {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
        }
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self.filterable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }
}

/// Index definition used by create-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<IndexField>,
}

impl IndexSchema {
    pub fn key_field(&self) -> Option<&IndexField> {
        self.fields.iter().find(|f| f.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_record_wire_names() {
        let rec = IndexedDocumentRecord {
            id: IndexedDocumentRecord::chunk_id("doc1", 0),
            document_id: "doc1".into(),
            file_name: "policy.txt".into(),
            file_url: "file:///tmp/policy.txt".into(),
            content: "Returns accepted within 30 days".into(),
            chunk_index: 0,
            total_chunks: 1,
            num_pages: 1,
            uploaded_at: "2024-01-01T00:00:00Z".into(),
            content_vector: None,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["id"], "doc1_chunk_0");
        assert_eq!(json["documentId"], "doc1");
        assert_eq!(json["chunkIndex"], 0);
        assert_eq!(json["totalChunks"], 1);
        assert_eq!(json["numPages"], 1);
        assert!(json.get("uploadedAt").is_some());
        assert!(json.get("contentVector").is_none());
    }

    #[test]
    fn test_order_status_case_insensitive() {
        assert_eq!(OrderStatus::from("Delivered"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from("PENDING"), OrderStatus::Pending);
        assert_eq!(OrderStatus::from("on-hold"), OrderStatus::Other("on-hold".into()));

        let order: OrderRecord = serde_json::from_value(serde_json::json!({
            "order_id": "ORD-2024-001",
            "customer_id": "CUST-001",
            "order_date": "2024-01-02",
            "status": "Processing",
            "total_amount": 59.5,
        }))
        .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.delivery_date.is_none());
        assert_eq!(serde_json::to_value(&order).unwrap()["status"], "processing");
    }

    #[test]
    fn test_decision_field_names() {
        let d = EligibilityDecision {
            eligible: true,
            reason: "Within window".into(),
            message: "ok".into(),
            refund_amount: 10.0,
            restocking_fee: 1.5,
        };
        let json = serde_json::to_value(&d).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        for k in ["eligible", "reason", "message", "refundAmount", "restockingFee"] {
            assert!(json.get(k).is_some(), "missing {k}");
        }
    }

    #[test]
    fn test_search_options_builder() {
        let opts = SearchOptions::top(10).with_filter("status eq 'Pending'").with_count();
        assert_eq!(opts.top, 10);
        assert!(opts.include_count);
        assert_eq!(opts.filter.as_deref(), Some("status eq 'Pending'"));
    }
}
