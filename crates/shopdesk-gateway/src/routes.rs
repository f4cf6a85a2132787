//! API route handlers for the gateway.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use shopdesk_agent::{NewOrder, ReturnOutcome};
use shopdesk_core::error::ShopDeskError;
use shopdesk_core::types::OrderPatch;

use super::server::AppState;

/// Error body `{ok: false, error}` with a status derived from the error kind.
pub struct ApiError(pub ShopDeskError);

impl From<ShopDeskError> for ApiError {
    fn from(e: ShopDeskError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ShopDeskError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("❌ Request failed: {}", self.0);
        }
        (status, Json(json!({"ok": false, "error": self.0.to_string()}))).into_response()
    }
}

type ApiResult = std::result::Result<Response, ApiError>;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "shopdesk-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

/// Chat endpoint: classify, retrieve, answer.
pub async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> ApiResult {
    let reply = state.assistant.chat.handle(&req.message).await?;
    Ok(Json(reply).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub items: Option<Value>,
}

/// Return request: evaluate eligibility and issue an RMA when eligible.
pub async fn create_return(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReturnRequest>,
) -> ApiResult {
    let outcome = state
        .assistant
        .returns
        .request_return(&req.order_id, &req.reason, req.items)
        .await?;
    Ok(match outcome {
        ReturnOutcome::Created { record, .. } => (
            StatusCode::CREATED,
            Json(json!({
                "eligible": true,
                "rma_number": record.return_id,
                "return": record,
                "message": "Return request created successfully",
            })),
        )
            .into_response(),
        ReturnOutcome::Rejected(decision) => Json(json!({
            "eligible": false,
            "reason": decision.reason,
            "message": decision.message,
        }))
        .into_response(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ReturnsQuery {
    pub order_id: Option<String>,
}

pub async fn list_returns(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ReturnsQuery>,
) -> ApiResult {
    let returns = state.assistant.returns.list_returns(q.order_id.as_deref()).await?;
    Ok(Json(json!({"count": returns.len(), "returns": returns})).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub customer_id: Option<String>,
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OrdersQuery>,
) -> ApiResult {
    let orders = state.assistant.orders.list_orders(q.customer_id.as_deref()).await?;
    Ok(Json(json!({"count": orders.len(), "orders": orders})).into_response())
}

pub async fn get_order(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult {
    let order = state.assistant.orders.get_order(&id).await?;
    Ok(Json(order).into_response())
}

/// New order: id, status and order date are assigned here, not by the client.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewOrder>,
) -> ApiResult {
    let order = state.assistant.orders.place_order(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"ok": true, "order": order, "message": "Order created successfully"})),
    )
        .into_response())
}

pub async fn update_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<OrderPatch>,
) -> ApiResult {
    let order = state.assistant.orders.update_order(&id, &patch).await?;
    Ok(Json(json!({"ok": true, "order": order})).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub file_name: Option<String>,
}

/// Document upload: raw body, file name in the query string.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult {
    let file_name = q.file_name.unwrap_or_default();
    let report = state.assistant.ingest.ingest(&body, &file_name).await?;
    Ok(Json(json!({
        "ok": true,
        "message": report.message(),
        "document": report,
    }))
    .into_response())
}

pub async fn list_documents(State(state): State<Arc<AppState>>) -> ApiResult {
    let documents = state.assistant.list_documents().await?;
    Ok(Json(json!({"count": documents.len(), "documents": documents})).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Indexed chunk records (top 50).
pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> ApiResult {
    let results = state
        .assistant
        .search_documents(q.q.as_deref().unwrap_or("*"), 50)
        .await?;
    Ok(Json(json!({
        "count": results.count.unwrap_or(results.records.len() as u64),
        "documents": results.records,
    }))
    .into_response())
}
