//! Unified OpenAI-compatible provider.
//!
//! A single struct that handles chat completions and embeddings for every
//! OpenAI-compatible API, including Azure OpenAI deployments.
//! Different providers are distinguished only by endpoint URL, URL layout,
//! auth style and API key.

use async_trait::async_trait;
use serde_json::{Value, json};
use shopdesk_core::config::LlmConfig;
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::{ChatProvider, EmbeddingProvider};
use shopdesk_core::types::{CompletionParams, Message};

use crate::provider_registry::{AuthStyle, ProviderConfig, UrlStyle};

/// A unified provider that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    /// Provider name (e.g., "openai", "azure", "ollama").
    name: String,
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    chat_path: String,
    embeddings_path: String,
    auth_style: AuthStyle,
    url_style: UrlStyle,
    /// Azure `api-version`.
    api_version: String,
    /// Chat model, or deployment name for Azure.
    chat_model: String,
    /// Embedding model, or deployment name for Azure.
    embedding_model: String,
    dimensions: usize,
    /// HTTP client.
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a known provider config + LLM config.
    ///
    /// Resolution order:
    /// - API key: `config.api_key` > env vars > empty
    /// - Base URL: `config.endpoint` > env override > registry default
    pub fn from_registry(registry: &ProviderConfig, config: &LlmConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !config.endpoint.is_empty() {
            config.endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    let val = val.trim_end_matches('/');
                    // OLLAMA_HOST is usually given without /v1
                    if registry.url_style == UrlStyle::OpenAi && !val.ends_with("/v1") {
                        Some(format!("{val}/v1"))
                    } else {
                        Some(val.to_string())
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        if base_url.is_empty() {
            return Err(ShopDeskError::Config(format!(
                "{} requires llm.endpoint (or {})",
                registry.name,
                registry.base_url_env.unwrap_or("an endpoint env var")
            )));
        }

        Self::build(
            registry.name.to_string(),
            api_key,
            base_url,
            registry.chat_path,
            registry.embeddings_path,
            registry.auth_style,
            registry.url_style,
            config,
        )
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, config: &LlmConfig) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Self::build(
            "custom".to_string(),
            api_key,
            base_url,
            "/chat/completions",
            "/embeddings",
            auth_style,
            UrlStyle::OpenAi,
            config,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        name: String,
        api_key: String,
        base_url: String,
        chat_path: &str,
        embeddings_path: &str,
        auth_style: AuthStyle,
        url_style: UrlStyle,
        config: &LlmConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ShopDeskError::Http(format!("HTTP client error: {e}")))?;

        Ok(Self {
            name,
            api_key,
            base_url,
            chat_path: chat_path.to_string(),
            embeddings_path: embeddings_path.to_string(),
            auth_style,
            url_style,
            api_version: config.api_version.clone(),
            chat_model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            client,
        })
    }

    /// Full URL for an endpoint path, addressed to `model`.
    fn endpoint_url(&self, path: &str, model: &str) -> String {
        match self.url_style {
            UrlStyle::OpenAi => format!("{}{}", self.base_url, path),
            UrlStyle::AzureDeployment => format!(
                "{}/openai/deployments/{}{}?api-version={}",
                self.base_url, model, path, self.api_version
            ),
        }
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            AuthStyle::ApiKeyHeader if !self.api_key.is_empty() => {
                req.header("api-key", &self.api_key)
            }
            _ => req,
        }
    }

    fn check_key(&self) -> Result<()> {
        if self.auth_style != AuthStyle::None && self.api_key.is_empty() {
            return Err(ShopDeskError::ApiKeyMissing(self.name.clone()));
        }
        Ok(())
    }

    /// POST a JSON body and return the parsed JSON response.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let req = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            ShopDeskError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ShopDeskError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        resp.json()
            .await
            .map_err(|e| ShopDeskError::Http(e.to_string()))
    }
}

/// Pull the assistant text out of a chat-completions response.
/// Empty or whitespace-only content counts as missing.
pub fn parse_chat_content(json: &Value) -> Result<Option<String>> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| ShopDeskError::Provider("No choices in response".into()))?;
    Ok(choice["message"]["content"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(String::from))
}

/// Pull the first vector out of an embeddings response.
pub fn parse_embedding(json: &Value) -> Result<Vec<f32>> {
    let values = json["data"]
        .get(0)
        .and_then(|d| d["embedding"].as_array())
        .ok_or_else(|| ShopDeskError::Embedding("No embedding in response".into()))?;
    let vector: Vec<f32> = values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();
    if vector.is_empty() || vector.len() != values.len() {
        return Err(ShopDeskError::Embedding("Malformed embedding vector".into()));
    }
    Ok(vector)
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &CompletionParams,
    ) -> Result<Option<String>> {
        self.check_key()?;

        let mut body = json!({
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });
        if self.url_style == UrlStyle::OpenAi {
            body["model"] = json!(self.chat_model);
        }

        let url = self.endpoint_url(&self.chat_path, &self.chat_model);
        let json = self.post_json(&url, &body).await?;

        if let Some(usage) = json["usage"].as_object() {
            tracing::debug!(
                "💬 {} completion: {} prompt + {} completion tokens",
                self.name,
                usage.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0)
            );
        }

        parse_chat_content(&json)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.check_key()
            .map_err(|e| ShopDeskError::Embedding(e.to_string()))?;

        let mut body = json!({ "input": [text] });
        if self.url_style == UrlStyle::OpenAi {
            body["model"] = json!(self.embedding_model);
        }

        let url = self.endpoint_url(&self.embeddings_path, &self.embedding_model);
        let json = self
            .post_json(&url, &body)
            .await
            .map_err(|e| ShopDeskError::Embedding(e.to_string()))?;
        parse_embedding(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider_registry::get_provider_config;

    fn llm_config() -> LlmConfig {
        LlmConfig {
            model: "gpt-4o".into(),
            embedding_model: "text-embedding-ada-002".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_openai_urls() {
        let mut cfg = llm_config();
        cfg.api_key = "sk-test".into();
        let p = OpenAiCompatibleProvider::from_registry(get_provider_config("openai").unwrap(), &cfg)
            .unwrap();
        assert_eq!(
            p.endpoint_url("/chat/completions", "gpt-4o"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_azure_urls() {
        let mut cfg = llm_config();
        cfg.endpoint = "https://shop.openai.azure.com/".into();
        cfg.api_key = "azure-key".into();
        let p = OpenAiCompatibleProvider::from_registry(get_provider_config("azure").unwrap(), &cfg)
            .unwrap();
        assert_eq!(
            p.endpoint_url("/embeddings", "text-embedding-ada-002"),
            "https://shop.openai.azure.com/openai/deployments/text-embedding-ada-002/embeddings?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_custom_endpoint() {
        let p = OpenAiCompatibleProvider::custom("custom:http://localhost:9000/v1/", &llm_config())
            .unwrap();
        assert_eq!(ChatProvider::name(&p), "custom");
        assert_eq!(p.base_url, "http://localhost:9000/v1");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let mut cfg = llm_config();
        cfg.endpoint = "http://127.0.0.1:9".into();
        let registry = get_provider_config("openai").unwrap();
        let p = OpenAiCompatibleProvider::from_registry(registry, &cfg).unwrap();
        if !p.api_key.is_empty() {
            return; // OPENAI_API_KEY present in the environment
        }
        let err = p
            .complete(&[Message::user("hi")], &CompletionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopDeskError::ApiKeyMissing(_)));

        let err = p.embed("hi").await.unwrap_err();
        assert!(matches!(err, ShopDeskError::Embedding(_)));
    }

    #[test]
    fn test_parse_chat_content() {
        let json = json!({"choices": [{"message": {"content": "Hello!"}}]});
        assert_eq!(parse_chat_content(&json).unwrap().as_deref(), Some("Hello!"));

        let empty = json!({"choices": [{"message": {"content": "  "}}]});
        assert_eq!(parse_chat_content(&empty).unwrap(), None);

        let null = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(parse_chat_content(&null).unwrap(), None);

        assert!(parse_chat_content(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_parse_embedding() {
        let json = json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]});
        assert_eq!(parse_embedding(&json).unwrap().len(), 3);
        assert!(parse_embedding(&json!({"data": []})).is_err());
        assert!(parse_embedding(&json!({"data": [{"embedding": [0.1, "x"]}]})).is_err());
    }
}
