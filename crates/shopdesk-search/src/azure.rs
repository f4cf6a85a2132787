//! Azure AI Search REST client.
//!
//! Talks to `{endpoint}/indexes/{name}/docs/...` with an `api-key` header.
//! Response metadata keys (`@search.score`, ...) are stripped from returned records.

use async_trait::async_trait;
use serde_json::{Value, json};
use shopdesk_core::config::SearchConfig;
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::SearchIndex;
use shopdesk_core::types::{IndexSchema, SearchMode, SearchOptions, SearchResults, VectorOptions};

use crate::schema::to_azure_definition;

pub struct AzureSearchIndex {
    name: String,
    endpoint: String,
    api_key: String,
    api_version: String,
    client: reqwest::Client,
}

impl AzureSearchIndex {
    pub fn new(name: &str, config: &SearchConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(ShopDeskError::Config(
                "search.endpoint is required for the azure backend".into(),
            ));
        }
        let api_key = if config.api_key.is_empty() {
            std::env::var("AZURE_SEARCH_KEY").unwrap_or_default()
        } else {
            config.api_key.clone()
        };
        if api_key.is_empty() {
            return Err(ShopDeskError::ApiKeyMissing("azure search".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ShopDeskError::Http(format!("HTTP client error: {e}")))?;

        Ok(Self {
            name: name.to_string(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.api_version.clone(),
            client,
        })
    }

    fn index_url(&self) -> String {
        format!(
            "{}/indexes/{}?api-version={}",
            self.endpoint, self.name, self.api_version
        )
    }

    fn docs_url(&self, op: &str) -> String {
        format!(
            "{}/indexes/{}/docs/{}?api-version={}",
            self.endpoint, self.name, op, self.api_version
        )
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        req.header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| ShopDeskError::Http(format!("Search '{}' unreachable: {e}", self.name)))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let resp = self.send(self.client.post(url).json(body)).await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ShopDeskError::Search(format!(
                "Search '{}' returned {status}: {text}",
                self.name
            )));
        }
        resp.json()
            .await
            .map_err(|e| ShopDeskError::Search(format!("Invalid search response: {e}")))
    }
}

/// Body for `docs/search`.
pub fn search_body(text: &str, options: &SearchOptions) -> Value {
    let mut body = json!({
        "search": text,
        "top": options.top,
        "count": options.include_count,
        "searchMode": match options.search_mode {
            SearchMode::Any => "any",
            SearchMode::All => "all",
        },
    });
    if let Some(filter) = &options.filter {
        body["filter"] = json!(filter);
    }
    if !options.select.is_empty() {
        body["select"] = json!(options.select.join(","));
    }
    body
}

/// Body for a pure vector `docs/search`.
pub fn vector_body(vector: &[f32], options: &VectorOptions) -> Value {
    let mut body = json!({
        "top": options.top,
        "vectorQueries": [{
            "kind": "vector",
            "vector": vector,
            "fields": options.field,
            "k": options.top,
        }],
    });
    if let Some(filter) = &options.filter {
        body["filter"] = json!(filter);
    }
    body
}

/// Parse a `docs/search` response.
pub fn parse_results(resp: &Value) -> SearchResults {
    let records = resp["value"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(
                        map.iter()
                            .filter(|(k, _)| !k.starts_with("@search."))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    ),
                    other => other.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    SearchResults {
        records,
        count: resp["@odata.count"].as_u64(),
    }
}

/// Keys of records the service refused in a `docs/index` response.
pub fn failed_keys(resp: &Value) -> Vec<String> {
    resp["value"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|r| r["status"].as_bool() == Some(false))
                .map(|r| r["key"].as_str().unwrap_or("?").to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchIndex for AzureSearchIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload_batch(&self, records: &[Value]) -> Result<()> {
        let actions: Vec<Value> = records
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r["@search.action"] = json!("upload");
                r
            })
            .collect();
        let resp = self
            .post_json(&self.docs_url("index"), &json!({ "value": actions }))
            .await?;
        let failed = failed_keys(&resp);
        if !failed.is_empty() {
            return Err(ShopDeskError::Search(format!(
                "{} of {} records rejected by '{}': {}",
                failed.len(),
                records.len(),
                self.name,
                failed.join(", ")
            )));
        }
        tracing::debug!("📤 {} ← {} records", self.name, records.len());
        Ok(())
    }

    async fn query(&self, text: &str, options: &SearchOptions) -> Result<SearchResults> {
        let resp = self
            .post_json(&self.docs_url("search"), &search_body(text, options))
            .await?;
        Ok(parse_results(&resp))
    }

    async fn vector_query(&self, vector: &[f32], options: &VectorOptions) -> Result<SearchResults> {
        let resp = self
            .post_json(&self.docs_url("search"), &vector_body(vector, options))
            .await?;
        Ok(parse_results(&resp))
    }

    async fn ensure_index(&self, schema: &IndexSchema) -> Result<()> {
        let resp = self.send(self.client.get(self.index_url())).await?;
        match resp.status().as_u16() {
            200 => {
                tracing::debug!("🗂️ Index '{}' already exists", self.name);
                Ok(())
            }
            404 => {
                let body = to_azure_definition(schema);
                let resp = self.send(self.client.put(self.index_url()).json(&body)).await?;
                if !resp.status().is_success() {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    return Err(ShopDeskError::Search(format!(
                        "Creating index '{}' failed ({status}): {text}",
                        self.name
                    )));
                }
                tracing::info!("🗂️ Created index '{}'", self.name);
                Ok(())
            }
            other => Err(ShopDeskError::Search(format!(
                "Checking index '{}' failed ({other})",
                self.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_endpoint_and_key() {
        let cfg = SearchConfig {
            backend: "azure".into(),
            ..Default::default()
        };
        assert!(matches!(
            AzureSearchIndex::new("orders", &cfg),
            Err(ShopDeskError::Config(_))
        ));
    }

    #[test]
    fn test_urls() {
        let cfg = SearchConfig {
            backend: "azure".into(),
            endpoint: "https://shop.search.windows.net/".into(),
            api_key: "k".into(),
            ..Default::default()
        };
        let idx = AzureSearchIndex::new("ecommerce-orders", &cfg).unwrap();
        assert_eq!(
            idx.docs_url("search"),
            "https://shop.search.windows.net/indexes/ecommerce-orders/docs/search?api-version=2023-11-01"
        );
        assert_eq!(
            idx.index_url(),
            "https://shop.search.windows.net/indexes/ecommerce-orders?api-version=2023-11-01"
        );
    }

    #[test]
    fn test_search_body() {
        let opts = SearchOptions::top(10)
            .with_filter("address_state eq 'NV'")
            .with_count();
        let body = search_body("*", &opts);
        assert_eq!(body["search"], "*");
        assert_eq!(body["top"], 10);
        assert_eq!(body["count"], true);
        assert_eq!(body["searchMode"], "any");
        assert_eq!(body["filter"], "address_state eq 'NV'");
        assert!(body.get("select").is_none());
    }

    #[test]
    fn test_vector_body() {
        let body = vector_body(&[0.5, 0.25], &VectorOptions::new("contentVector", 3));
        assert_eq!(body["vectorQueries"][0]["fields"], "contentVector");
        assert_eq!(body["vectorQueries"][0]["k"], 3);
        assert_eq!(body["vectorQueries"][0]["vector"][1], 0.25);
    }

    #[test]
    fn test_parse_results_strips_metadata() {
        let resp = json!({
            "@odata.count": 7,
            "value": [{"@search.score": 1.2, "order_id": "ORD-2024-001"}]
        });
        let res = parse_results(&resp);
        assert_eq!(res.count, Some(7));
        assert_eq!(res.records[0], json!({"order_id": "ORD-2024-001"}));
    }

    #[test]
    fn test_failed_keys() {
        let resp = json!({"value": [
            {"key": "a", "status": true},
            {"key": "b", "status": false, "errorMessage": "bad"}
        ]});
        assert_eq!(failed_keys(&resp), vec!["b".to_string()]);
    }
}
