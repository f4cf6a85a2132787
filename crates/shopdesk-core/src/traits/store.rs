//! Order and return persistence traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{OrderPatch, OrderRecord, ReturnRecord, ReturnStatus};

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>>;
    async fn create_order(&self, order: &OrderRecord) -> Result<()>;
    async fn list_orders(&self, customer_id: Option<&str>) -> Result<Vec<OrderRecord>>;
    /// Apply a patch and return the updated order. Unknown id → `NotFound`.
    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> Result<OrderRecord>;
}

#[async_trait]
pub trait ReturnStore: Send + Sync {
    async fn get_return(&self, return_id: &str) -> Result<Option<ReturnRecord>>;
    async fn create_return(&self, record: &ReturnRecord) -> Result<()>;
    async fn list_returns(&self, order_id: Option<&str>) -> Result<Vec<ReturnRecord>>;
    async fn update_return_status(&self, return_id: &str, status: ReturnStatus) -> Result<()>;
}
