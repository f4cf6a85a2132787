//! Provider registry: maps provider names to endpoint configurations.
//!
//! Every hosted LLM ShopDesk can talk to speaks the OpenAI chat/embeddings
//! wire format. They differ only in base URL, auth header and URL layout.

/// How to attach auth credentials to requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `api-key: <key>` (Azure OpenAI)
    ApiKeyHeader,
    /// No authentication required (local servers).
    None,
}

/// How request URLs are laid out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UrlStyle {
    /// `{base}{path}` with the model named in the body.
    OpenAi,
    /// `{base}/openai/deployments/{deployment}{path}?api-version=...`
    AzureDeployment,
}

/// Configuration for a single provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider identifier.
    pub name: &'static str,
    /// Base URL for the API.
    pub base_url: &'static str,
    /// Path for chat completions (appended to base_url).
    pub chat_path: &'static str,
    /// Path for embeddings (appended to base_url).
    pub embeddings_path: &'static str,
    /// Environment variable names to try for the API key (in order).
    pub env_keys: &'static [&'static str],
    /// How to send auth credentials.
    pub auth_style: AuthStyle,
    pub url_style: UrlStyle,
    /// Environment variable to override the base URL (e.g., OLLAMA_HOST).
    pub base_url_env: Option<&'static str>,
}

// ─── Provider Definitions ────────────────────────────────────────────────────

static PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "openai",
        base_url: "https://api.openai.com/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &["OPENAI_API_KEY"],
        auth_style: AuthStyle::Bearer,
        url_style: UrlStyle::OpenAi,
        base_url_env: Some("OPENAI_API_BASE"),
    },
    ProviderConfig {
        name: "azure",
        base_url: "",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &["AZURE_OPENAI_API_KEY", "AZURE_OPENAI_KEY"],
        auth_style: AuthStyle::ApiKeyHeader,
        url_style: UrlStyle::AzureDeployment,
        base_url_env: Some("AZURE_OPENAI_ENDPOINT"),
    },
    ProviderConfig {
        name: "ollama",
        base_url: "http://localhost:11434/v1",
        chat_path: "/chat/completions",
        embeddings_path: "/embeddings",
        env_keys: &[],
        auth_style: AuthStyle::None,
        url_style: UrlStyle::OpenAi,
        base_url_env: Some("OLLAMA_HOST"),
    },
];

/// Look up a provider config by name.
pub fn get_provider_config(name: &str) -> Option<&'static ProviderConfig> {
    // Also match aliases
    let lookup = match name {
        "azure_openai" | "azure-openai" | "azureopenai" => "azure",
        other => other,
    };
    PROVIDERS.iter().find(|p| p.name == lookup)
}

/// List all known provider names.
pub fn all_provider_names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
