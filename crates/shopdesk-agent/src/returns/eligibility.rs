//! Return eligibility evaluation.
//!
//! Asks the chat model for a JSON verdict grounded in the return-policy
//! documents, then passes it through [`DecisionGuard`]. When retrieval, the
//! model or parsing fails, a deterministic window check decides instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use shopdesk_core::config::ReturnsConfig;
use shopdesk_core::error::{Result, ShopDeskError};
use shopdesk_core::traits::ChatProvider;
use shopdesk_core::types::{CompletionParams, EligibilityDecision, Message, OrderRecord, OrderStatus};

use super::guard::{DecisionGuard, WINDOW_EXPIRED};
use crate::retriever::{PolicyRetriever, join_contents};

pub const SYSTEM_MESSAGE: &str =
    "You are a return policy expert. Analyze return requests and provide eligibility decisions in JSON format.";

pub type Clock = fn() -> DateTime<Utc>;

/// Parse `delivery_date` (RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`, UTC assumed).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Whole days between delivery and `now`; `None` when undelivered or unparseable.
pub fn days_since_delivery(order: &OrderRecord, now: DateTime<Utc>) -> Option<i64> {
    let delivered = parse_date(order.delivery_date.as_deref()?)?;
    Some((now - delivered).num_days())
}

/// Standard-policy verdict used whenever the model path is unavailable.
pub fn fallback_decision(order: &OrderRecord, days: Option<i64>, window: i64) -> EligibilityDecision {
    let within_window = days.is_some_and(|d| d <= window);
    let eligible = within_window && order.status == OrderStatus::Delivered;
    let reason = if eligible {
        "Within return window"
    } else if days.is_some_and(|d| d > window) {
        WINDOW_EXPIRED
    } else {
        "Order not delivered"
    };
    EligibilityDecision {
        eligible,
        reason: reason.into(),
        message: format!(
            "Based on standard policy, this return is {}",
            if eligible { "eligible" } else { "not eligible" }
        ),
        refund_amount: order.total_amount,
        restocking_fee: 0.0,
    }
}

pub fn build_prompt(order: &OrderRecord, reason: &str, days: Option<i64>, policy: &str) -> String {
    let delivery = order.delivery_date.as_deref().unwrap_or("Not delivered");
    let days = days.map(|d| d.to_string()).unwrap_or_else(|| "N/A".into());
    format!(
        "Analyze this return request for eligibility:

Order Information:
- Order ID: {}
- Order Date: {}
- Delivery Date: {delivery}
- Days Since Delivery: {days}
- Order Status: {}
- Total Amount: ${:.2}

Return Request:
- Reason: {reason}

Return Policy:
{policy}

Determine:
1. Is this return eligible? (yes/no)
2. If not eligible, why?
3. If eligible, what is the refund amount? (consider restocking fees if applicable)
4. Any restocking fee amount?

Respond in JSON format:
{{
  \"eligible\": true/false,
  \"reason\": \"brief reason\",
  \"message\": \"customer-friendly explanation\",
  \"refundAmount\": number,
  \"restockingFee\": number
}}",
        order.order_id, order.order_date, order.status, order.total_amount
    )
}

/// First `{` through last `}` of the reply.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').parse().ok(),
        _ => None,
    }
}

fn as_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read a model verdict. `eligible` is required; a missing refund means the
/// full `order_total`, a missing fee means 0.
pub fn parse_decision(reply: &str, order_total: f64) -> Result<EligibilityDecision> {
    let json = extract_json(reply)
        .ok_or_else(|| ShopDeskError::Provider("No JSON object in eligibility reply".into()))?;
    let v: Value = serde_json::from_str(json)?;
    let eligible = v
        .get("eligible")
        .and_then(as_flag)
        .ok_or_else(|| ShopDeskError::Provider("Eligibility reply lacks 'eligible'".into()))?;
    let text = |key: &str| v.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
    Ok(EligibilityDecision {
        eligible,
        reason: text("reason"),
        message: text("message"),
        refund_amount: v.get("refundAmount").and_then(as_number).unwrap_or(order_total),
        restocking_fee: v.get("restockingFee").and_then(as_number).unwrap_or(0.0),
    })
}

pub struct EligibilityEvaluator {
    chat: Arc<dyn ChatProvider>,
    policy: PolicyRetriever,
    config: ReturnsConfig,
    guard: DecisionGuard,
    clock: Clock,
}

impl EligibilityEvaluator {
    pub fn new(chat: Arc<dyn ChatProvider>, policy: PolicyRetriever, config: ReturnsConfig) -> Self {
        Self {
            guard: DecisionGuard::new(config.return_window_days),
            chat,
            policy,
            config,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Decide whether `order` may be returned for `reason`. Never fails.
    pub async fn evaluate(&self, order: &OrderRecord, reason: &str) -> EligibilityDecision {
        if !order.total_amount.is_finite() || order.total_amount < 0.0 {
            tracing::error!("❌ {}: invalid order total {}", order.order_id, order.total_amount);
            return EligibilityDecision::internal_error();
        }
        let days = days_since_delivery(order, (self.clock)());

        match self.ask_model(order, reason, days).await {
            Ok(decision) => {
                let decision = self.guard.review(decision, order, days);
                tracing::info!(
                    "⚖️ {} eligible={} refund={:.2}",
                    order.order_id,
                    decision.eligible,
                    decision.refund_amount
                );
                decision
            }
            Err(e) => {
                tracing::warn!("⚠️ {}: model decision unavailable ({e}), using standard policy", order.order_id);
                fallback_decision(order, days, self.config.return_window_days)
            }
        }
    }

    async fn ask_model(
        &self,
        order: &OrderRecord,
        reason: &str,
        days: Option<i64>,
    ) -> Result<EligibilityDecision> {
        let docs = self
            .policy
            .vector_search(&self.config.policy_query, self.config.policy_top)
            .await?;
        let policy = join_contents(&docs);

        let messages = [
            Message::system(SYSTEM_MESSAGE),
            Message::user(build_prompt(order, reason, days, &policy)),
        ];
        let params = CompletionParams {
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let reply = self
            .chat
            .complete(&messages, &params)
            .await?
            .ok_or_else(|| ShopDeskError::Provider("Empty eligibility reply".into()))?;
        parse_decision(&reply, order.total_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChat, FakeEmbedder, RecordingIndex, order};
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap_or_default()
    }

    fn policy_docs() -> Arc<RecordingIndex> {
        Arc::new(RecordingIndex::new(
            "docs",
            vec![json!({"id": "p", "content": "Items may be returned within 30 days of delivery.", "contentVector": [1.0, 0.0, 0.0]})],
        ))
    }

    fn evaluator(chat: Arc<FakeChat>, embedder: FakeEmbedder) -> EligibilityEvaluator {
        let policy = PolicyRetriever::new(policy_docs(), Arc::new(embedder));
        EligibilityEvaluator::new(chat, policy, ReturnsConfig::default()).with_clock(fixed_now)
    }

    #[test]
    fn test_days_since_delivery_formats() {
        let now = fixed_now();
        assert_eq!(days_since_delivery(&order("o", 1.0, Some("2024-02-20")), now), Some(10));
        assert_eq!(days_since_delivery(&order("o", 1.0, Some("2024-02-20T08:00:00Z")), now), Some(10));
        assert_eq!(days_since_delivery(&order("o", 1.0, Some("2024-01-01T00:00:00")), now), Some(60));
        assert_eq!(days_since_delivery(&order("o", 1.0, None), now), None);
        assert_eq!(days_since_delivery(&order("o", 1.0, Some("soon")), now), None);
    }

    #[test]
    fn test_fallback_rules() {
        let delivered = order("o", 40.0, Some("2024-02-20"));
        let d = fallback_decision(&delivered, Some(10), 30);
        assert!(d.eligible);
        assert_eq!(d.refund_amount, 40.0);
        assert_eq!(d.restocking_fee, 0.0);

        let d = fallback_decision(&delivered, Some(31), 30);
        assert!(!d.eligible);
        assert_eq!(d.reason, WINDOW_EXPIRED);

        let mut shipped = order("o", 40.0, None);
        shipped.status = OrderStatus::Shipped;
        let d = fallback_decision(&shipped, None, 30);
        assert!(!d.eligible);
        assert_eq!(d.reason, "Order not delivered");
    }

    #[test]
    fn test_fallback_never_approves_past_window() {
        let o = order("o", 10.0, Some("2023-01-01"));
        for days in [31, 60, 365, 10_000] {
            assert!(!fallback_decision(&o, Some(days), 30).eligible);
        }
    }

    #[test]
    fn test_extract_and_parse() {
        let reply = "Sure! ```json\n{\"eligible\": \"yes\", \"reason\": \"Defective\", \"refundAmount\": \"$49.50\"}\n```";
        let d = parse_decision(reply, 60.0).unwrap();
        assert!(d.eligible);
        assert_eq!(d.reason, "Defective");
        assert_eq!(d.refund_amount, 49.5);
        assert_eq!(d.restocking_fee, 0.0);

        assert!(parse_decision("no json here", 10.0).is_err());
        assert!(parse_decision("{\"reason\": \"x\"}", 10.0).is_err());
        assert_eq!(extract_json("} {"), None);
    }

    #[tokio::test]
    async fn test_model_decision_is_guarded() {
        let chat = Arc::new(FakeChat::replying(&[
            r#"{"eligible": true, "reason": "Damaged", "message": "Approved", "refundAmount": 500, "restockingFee": 0}"#,
        ]));
        let ev = evaluator(chat.clone(), FakeEmbedder::ok());
        let d = ev.evaluate(&order("ORD-2024-001", 129.99, Some("2024-02-20")), "Damaged").await;
        assert!(d.eligible);
        assert_eq!(d.refund_amount, 129.99);

        let (messages, params) = &chat.calls()[0];
        assert_eq!(messages[0].content, SYSTEM_MESSAGE);
        assert!(messages[1].content.contains("Days Since Delivery: 10"));
        assert!(messages[1].content.contains("within 30 days of delivery"));
        assert_eq!(params.max_tokens, 500);
        assert!((params.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_unparseable_reply_uses_fallback() {
        let chat = Arc::new(FakeChat::replying(&["I think it's fine."]));
        let ev = evaluator(chat, FakeEmbedder::ok());
        let d = ev.evaluate(&order("ORD-2024-001", 20.0, Some("2024-01-01")), "Changed mind").await;
        assert!(!d.eligible);
        assert_eq!(d.reason, WINDOW_EXPIRED);
        assert!(d.message.starts_with("Based on standard policy"));
    }

    #[tokio::test]
    async fn test_policy_retrieval_failure_uses_fallback() {
        let chat = Arc::new(FakeChat::replying(&[r#"{"eligible": false}"#]));
        let ev = evaluator(chat.clone(), FakeEmbedder::failing());
        let d = ev.evaluate(&order("ORD-2024-001", 20.0, Some("2024-02-25")), "Too small").await;
        assert!(d.eligible);
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_order_total_is_internal_error() {
        let chat = Arc::new(FakeChat::replying(&[]));
        let ev = evaluator(chat, FakeEmbedder::ok());
        let d = ev.evaluate(&order("ORD-2024-001", f64::NAN, None), "x").await;
        assert_eq!(d, EligibilityDecision::internal_error());
    }
}
