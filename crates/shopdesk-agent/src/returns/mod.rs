//! Return requests: order lookup → eligibility decision → return record.

pub mod eligibility;
pub mod guard;

use chrono::{Datelike, Utc};
use rand::Rng;
use serde_json::{Value, json};
use std::sync::Arc;

use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::{OrderStore, ReturnStore};
use shopdesk_core::types::{EligibilityDecision, ReturnRecord, ReturnStatus};

pub use eligibility::EligibilityEvaluator;
pub use guard::DecisionGuard;

const ID_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    Rejected(EligibilityDecision),
    Created {
        record: ReturnRecord,
        decision: EligibilityDecision,
    },
}

/// `RET-{year}-{4 digits}`.
pub fn new_return_id(year: i32) -> String {
    format!("RET-{year}-{:04}", rand::thread_rng().gen_range(0..10_000))
}

pub struct ReturnService {
    orders: Arc<dyn OrderStore>,
    returns: Arc<dyn ReturnStore>,
    evaluator: EligibilityEvaluator,
}

impl ReturnService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        returns: Arc<dyn ReturnStore>,
        evaluator: EligibilityEvaluator,
    ) -> Self {
        Self {
            orders,
            returns,
            evaluator,
        }
    }

    pub fn evaluator(&self) -> &EligibilityEvaluator {
        &self.evaluator
    }

    pub async fn request_return(
        &self,
        order_id: &str,
        reason: &str,
        items: Option<Value>,
    ) -> Result<ReturnOutcome> {
        let (order_id, reason) = (order_id.trim(), reason.trim());
        if order_id.is_empty() || reason.is_empty() {
            return Err(ShopDeskError::InvalidInput(
                "Order ID and reason are required".into(),
            ));
        }
        let order = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or_else(|| ShopDeskError::NotFound(format!("Order {order_id} not found")))?;

        let decision = self.evaluator.evaluate(&order, reason).await;
        if !decision.eligible {
            tracing::info!("🚫 Return for {order_id} rejected: {}", decision.reason);
            return Ok(ReturnOutcome::Rejected(decision));
        }

        let now = Utc::now();
        let mut record = ReturnRecord {
            return_id: String::new(),
            order_id: order.order_id.clone(),
            customer_id: order.customer_id.clone(),
            status: ReturnStatus::Pending,
            reason: reason.to_string(),
            items: items.unwrap_or_else(|| json!([])),
            refund_amount: decision.refund_amount,
            restocking_fee: decision.restocking_fee,
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            record.return_id = new_return_id(now.year());
            match self.returns.create_return(&record).await {
                Ok(()) => break,
                // duplicate id
                Err(ShopDeskError::InvalidInput(msg)) if attempt < ID_ATTEMPTS => {
                    tracing::debug!("Return id collision, retrying: {msg}");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!("📦 RMA {} issued for {order_id}", record.return_id);
        Ok(ReturnOutcome::Created { record, decision })
    }

    pub async fn list_returns(&self, order_id: Option<&str>) -> Result<Vec<ReturnRecord>> {
        self.returns.list_returns(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::PolicyRetriever;
    use crate::testing::{FakeChat, FakeEmbedder, RecordingIndex, order};
    use shopdesk_core::config::ReturnsConfig;
    use shopdesk_db::ShopDb;

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    async fn service(reply: &str) -> (ReturnService, Arc<ShopDb>) {
        let db = Arc::new(ShopDb::open_in_memory().unwrap());
        db.create_order(&order("ORD-2024-001", 129.99, Some(&today())))
            .await
            .unwrap();
        let policy = PolicyRetriever::new(
            Arc::new(RecordingIndex::new("docs", vec![])),
            Arc::new(FakeEmbedder::ok()),
        );
        let evaluator = EligibilityEvaluator::new(
            Arc::new(FakeChat::replying(&[reply])),
            policy,
            ReturnsConfig::default(),
        );
        (ReturnService::new(db.clone(), db.clone(), evaluator), db)
    }

    #[test]
    fn test_return_id_format() {
        let id = new_return_id(2024);
        assert!(id.starts_with("RET-2024-"));
        assert_eq!(id.len(), "RET-2024-0000".len());
        assert!(id[9..].chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_eligible_request_creates_pending_return() {
        let (svc, db) = service(
            r#"{"eligible": true, "reason": "Defective", "message": "Approved", "refundAmount": 100.0, "restockingFee": 10}"#,
        )
        .await;
        let outcome = svc
            .request_return("ORD-2024-001", "Arrived broken", Some(json!(["PROD-001"])))
            .await
            .unwrap();
        let ReturnOutcome::Created { record, decision } = outcome else {
            panic!("expected a created return");
        };
        assert!(decision.eligible);
        assert_eq!(record.status, ReturnStatus::Pending);
        assert_eq!(record.refund_amount, 100.0);
        assert_eq!(record.restocking_fee, 10.0);
        assert_eq!(record.customer_id, "CUST-001");

        let stored = db.get_return(&record.return_id).await.unwrap().unwrap();
        assert_eq!(stored.items, json!(["PROD-001"]));
        assert_eq!(svc.list_returns(Some("ORD-2024-001")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ineligible_request_persists_nothing() {
        let (svc, db) = service(r#"{"eligible": false, "reason": "Final sale", "message": "Not returnable"}"#).await;
        let outcome = svc.request_return("ORD-2024-001", "Changed mind", None).await.unwrap();
        match outcome {
            ReturnOutcome::Rejected(d) => assert_eq!(d.reason, "Final sale"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(db.list_returns(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_and_unknown_order() {
        let (svc, _) = service("{}").await;
        assert!(matches!(
            svc.request_return("", "reason", None).await,
            Err(ShopDeskError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.request_return("ORD-2024-001", "  ", None).await,
            Err(ShopDeskError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.request_return("ORD-2099-999", "Damaged", None).await,
            Err(ShopDeskError::NotFound(_))
        ));
    }
}
