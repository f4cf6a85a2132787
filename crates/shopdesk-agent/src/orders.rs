//! Order placement: the server assigns the id, status and dates.

use chrono::{Datelike, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::OrderStore;
use shopdesk_core::types::{OrderPatch, OrderRecord, OrderStatus};

const ID_ATTEMPTS: usize = 5;

/// Client-supplied part of a new order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub items: Option<Value>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
}

/// `ORD-{year}-{3 digits}`.
pub fn new_order_id(year: i32) -> String {
    format!("ORD-{year}-{:03}", rand::thread_rng().gen_range(0..1_000))
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Create a `pending` order dated now under a fresh id.
    pub async fn place_order(&self, new: NewOrder) -> Result<OrderRecord> {
        let customer_id = new.customer_id.trim();
        if customer_id.is_empty() {
            return Err(ShopDeskError::InvalidInput("customer_id is required".into()));
        }
        if !new.total_amount.is_finite() || new.total_amount < 0.0 {
            return Err(ShopDeskError::InvalidInput(
                "total_amount must be a non-negative number".into(),
            ));
        }

        let now = Utc::now();
        let mut order = OrderRecord {
            order_id: String::new(),
            customer_id: customer_id.to_string(),
            order_date: now.to_rfc3339(),
            delivery_date: None,
            status: OrderStatus::Pending,
            total_amount: new.total_amount,
            items: new.items.unwrap_or_else(|| json!([])),
            shipping_address: new.shipping_address.unwrap_or(Value::Null),
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            order.order_id = new_order_id(now.year());
            match self.store.create_order(&order).await {
                Ok(()) => break,
                Err(ShopDeskError::InvalidInput(msg)) if attempt < ID_ATTEMPTS => {
                    tracing::debug!("Order id collision, retrying: {msg}");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!("🧾 Order {} created for {}", order.order_id, order.customer_id);
        Ok(order)
    }

    pub async fn get_order(&self, order_id: &str) -> Result<OrderRecord> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| ShopDeskError::NotFound(format!("Order {order_id} not found")))
    }

    pub async fn list_orders(&self, customer_id: Option<&str>) -> Result<Vec<OrderRecord>> {
        self.store.list_orders(customer_id).await
    }

    pub async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> Result<OrderRecord> {
        self.store.update_order(order_id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopdesk_db::ShopDb;

    fn service() -> (OrderService, Arc<ShopDb>) {
        let db = Arc::new(ShopDb::open_in_memory().unwrap());
        (OrderService::new(db.clone()), db)
    }

    #[test]
    fn test_order_id_format() {
        let id = new_order_id(2025);
        assert!(id.starts_with("ORD-2025-"));
        assert_eq!(id.len(), "ORD-2025-000".len());
        assert!(id[9..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_place_order_assigns_id_status_and_date() {
        let (svc, db) = service();
        let order = svc
            .place_order(NewOrder {
                customer_id: "CUST-001".into(),
                total_amount: 59.5,
                items: Some(json!([{"product_id": "PROD-002", "quantity": 2}])),
                shipping_address: Some(json!({"state": "CA"})),
            })
            .await
            .unwrap();

        let year = Utc::now().year();
        assert!(order.order_id.starts_with(&format!("ORD-{year}-")));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.order_date.starts_with(&year.to_string()));
        assert!(order.delivery_date.is_none());

        let stored = db.get_order(&order.order_id).await.unwrap().unwrap();
        assert_eq!(stored.items[0]["quantity"], 2);
        assert_eq!(stored.shipping_address["state"], "CA");
    }

    #[tokio::test]
    async fn test_place_order_requires_customer() {
        let (svc, db) = service();
        let err = svc.place_order(NewOrder::default()).await.unwrap_err();
        assert!(matches!(err, ShopDeskError::InvalidInput(_)));
        assert!(db.list_orders(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_order_is_not_found() {
        let (svc, _) = service();
        assert!(matches!(
            svc.get_order("ORD-1999-000").await,
            Err(ShopDeskError::NotFound(_))
        ));
    }
}
