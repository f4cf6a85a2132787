//! Index definitions.

use serde_json::{Value, json};
use shopdesk_core::types::{FieldKind, IndexField, IndexSchema};

/// Vector field holding chunk embeddings.
pub const CONTENT_VECTOR_FIELD: &str = "contentVector";

const VECTOR_PROFILE: &str = "vector-profile";
const VECTOR_ALGORITHM: &str = "hnsw-config";

/// Schema of the documents index: one record per chunk.
pub fn documents_schema(name: &str, dimensions: usize) -> IndexSchema {
    IndexSchema {
        name: name.to_string(),
        fields: vec![
            IndexField::new("id", FieldKind::String).key(),
            IndexField::new("documentId", FieldKind::String).filterable(),
            IndexField::new("fileName", FieldKind::String).searchable().filterable(),
            IndexField::new("fileUrl", FieldKind::String),
            IndexField::new("content", FieldKind::String).searchable(),
            IndexField::new("chunkIndex", FieldKind::Int32).filterable().sortable(),
            IndexField::new("totalChunks", FieldKind::Int32),
            IndexField::new("numPages", FieldKind::Int32),
            IndexField::new("uploadedAt", FieldKind::DateTime).filterable().sortable(),
            IndexField::new(CONTENT_VECTOR_FIELD, FieldKind::Vector(dimensions)).searchable(),
        ],
    }
}

fn edm_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "Edm.String",
        FieldKind::Int32 => "Edm.Int32",
        FieldKind::Int64 => "Edm.Int64",
        FieldKind::Double => "Edm.Double",
        FieldKind::Boolean => "Edm.Boolean",
        FieldKind::DateTime => "Edm.DateTimeOffset",
        FieldKind::Vector(_) => "Collection(Edm.Single)",
    }
}

/// Azure AI Search index definition body.
pub fn to_azure_definition(schema: &IndexSchema) -> Value {
    let fields: Vec<Value> = schema
        .fields
        .iter()
        .map(|f| match f.kind {
            FieldKind::Vector(dims) => json!({
                "name": f.name,
                "type": edm_type(f.kind),
                "searchable": true,
                "retrievable": false,
                "dimensions": dims,
                "vectorSearchProfile": VECTOR_PROFILE,
            }),
            kind => json!({
                "name": f.name,
                "type": edm_type(kind),
                "key": f.key,
                "searchable": f.searchable,
                "filterable": f.filterable,
                "sortable": f.sortable,
                "retrievable": true,
            }),
        })
        .collect();

    let mut def = json!({ "name": schema.name, "fields": fields });
    if schema.fields.iter().any(|f| matches!(f.kind, FieldKind::Vector(_))) {
        def["vectorSearch"] = json!({
            "algorithms": [{ "name": VECTOR_ALGORITHM, "kind": "hnsw" }],
            "profiles": [{ "name": VECTOR_PROFILE, "algorithm": VECTOR_ALGORITHM }],
        });
    }
    def
}
