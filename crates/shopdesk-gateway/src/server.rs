//! HTTP server implementation using Axum.

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use shopdesk_agent::ShopAssistant;
use shopdesk_core::config::{GatewayConfig, ShopDeskConfig};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub assistant: Arc<ShopAssistant>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(gateway_config: GatewayConfig, assistant: ShopAssistant) -> Self {
        Self {
            gateway_config,
            assistant: Arc::new(assistant),
            start_time: std::time::Instant::now(),
        }
    }
}

/// API key middleware: checks the X-Api-Key header when a key is configured.
async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let expected = &state.gateway_config.api_key;
    if expected.is_empty() {
        return next.run(req).await;
    }
    let given = req
        .headers()
        .get("X-Api-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if given == expected {
        return next.run(req).await;
    }
    tracing::warn!("🔒 Rejected {} {}: bad or missing API key", req.method(), req.uri().path());
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"ok": false, "error": "Unauthorized: invalid or missing API key"})),
    )
        .into_response()
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    let protected = Router::new()
        .route("/api/chat", post(super::routes::chat))
        .route(
            "/api/returns",
            post(super::routes::create_return).get(super::routes::list_returns),
        )
        .route(
            "/api/orders",
            get(super::routes::list_orders).post(super::routes::create_order),
        )
        .route("/api/orders/{id}", patch(super::routes::update_order).get(super::routes::get_order))
        .route(
            "/api/admin/documents",
            post(super::routes::upload_document)
                .get(super::routes::list_documents)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(
            "/api/admin/search-documents",
            get(super::routes::search_documents),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_api_key,
        ));

    let public = Router::new().route("/health", get(super::routes::health_check));

    let cors = CorsLayer::new()
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));
    // Restrict origins in production, e.g. SHOPDESK_CORS_ORIGINS=https://admin.example.com
    let cors = match std::env::var("SHOPDESK_CORS_ORIGINS") {
        Ok(origins) => cors.allow_origin(
            origins
                .split(',')
                .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ),
        Err(_) => cors.allow_origin(Any),
    };

    protected
        .merge(public)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server.
pub async fn start(config: &ShopDeskConfig) -> anyhow::Result<()> {
    let assistant = ShopAssistant::from_config(config)?;
    let gateway = config.gateway.clone();
    if gateway.api_key.is_empty() {
        tracing::warn!("⚠️ gateway.api_key is empty, API routes are unauthenticated");
    }
    let app = build_router(AppState::new(gateway.clone(), assistant));

    let addr = format!("{}:{}", gateway.host, gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{Value, json};
    use shopdesk_core::error::Result;
    use shopdesk_core::traits::{ChatProvider, EmbeddingProvider, SearchIndexes};
    use shopdesk_core::types::{CompletionParams, Message};
    use shopdesk_db::ShopDb;
    use shopdesk_knowledge::LocalFileStorage;
    use shopdesk_search::MemoryIndex;
    use tower::ServiceExt;

    /// Replies with `reply` to every prompt.
    struct EchoChat(&'static str);

    #[async_trait]
    impl ChatProvider for EchoChat {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, _: &[Message], _: &CompletionParams) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl EmbeddingProvider for UnitEmbedder {
        fn name(&self) -> &str {
            "unit"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn embed(&self, _: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    pub(crate) fn test_state(reply: &'static str, api_key: &str) -> AppState {
        let indexes = SearchIndexes {
            documents: Arc::new(MemoryIndex::new("documents")),
            orders: Arc::new(MemoryIndex::new("orders")),
            customers: Arc::new(MemoryIndex::new("customers")),
            products: Arc::new(MemoryIndex::new("products")),
            returns: Arc::new(MemoryIndex::new("returns")),
        };
        let root = std::env::temp_dir().join(format!(
            "shopdesk-gateway-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let assistant = ShopAssistant::from_parts(
            Arc::new(EchoChat(reply)),
            Arc::new(UnitEmbedder),
            indexes,
            Arc::new(ShopDb::open_in_memory().unwrap()),
            Arc::new(LocalFileStorage::new(&root)),
            &ShopDeskConfig::default(),
        )
        .unwrap();
        let gateway = GatewayConfig {
            api_key: api_key.to_string(),
            ..GatewayConfig::default()
        };
        AppState::new(gateway, assistant)
    }

    pub(crate) async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(test_state("hi", "secret"));
        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let app = build_router(test_state("hi", "secret"));
        let req = || {
            Request::post("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(json!({"message": "hello"}).to_string()))
        };
        let (status, body) = send(&app, req().unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["ok"], false);

        let authed = req().map(|mut r| {
            r.headers_mut().insert("X-Api-Key", "secret".parse().unwrap());
            r
        });
        let (status, body) = send(&app, authed.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "hi");
    }
}
