//! Bounds checks on model-produced eligibility decisions.

use shopdesk_core::types::{EligibilityDecision, OrderRecord};

pub const WINDOW_EXPIRED: &str = "Return window expired";

/// Keeps LLM decisions inside what the order facts allow.
#[derive(Debug, Clone, Copy)]
pub struct DecisionGuard {
    pub return_window_days: i64,
}

impl DecisionGuard {
    pub fn new(return_window_days: i64) -> Self {
        Self { return_window_days }
    }

    /// Clamp amounts to `[0, total]` with `refund + fee <= total`, and refuse
    /// approvals past the return window when the delivery date is known.
    pub fn review(
        &self,
        mut decision: EligibilityDecision,
        order: &OrderRecord,
        days_since_delivery: Option<i64>,
    ) -> EligibilityDecision {
        let id = &order.order_id;
        let total = if order.total_amount.is_finite() {
            order.total_amount.max(0.0)
        } else {
            0.0
        };

        if !decision.refund_amount.is_finite() {
            tracing::warn!("🛡️ {id}: non-numeric refund, using order total {total}");
            decision.refund_amount = total;
        }
        if !decision.restocking_fee.is_finite() {
            tracing::warn!("🛡️ {id}: non-numeric restocking fee, using 0");
            decision.restocking_fee = 0.0;
        }

        let refund = decision.refund_amount.clamp(0.0, total);
        if refund != decision.refund_amount {
            tracing::warn!(
                "🛡️ {id}: refund {} clamped to {refund}",
                decision.refund_amount
            );
            decision.refund_amount = refund;
        }
        let fee = decision.restocking_fee.clamp(0.0, total);
        if fee != decision.restocking_fee {
            tracing::warn!(
                "🛡️ {id}: restocking fee {} clamped to {fee}",
                decision.restocking_fee
            );
            decision.restocking_fee = fee;
        }
        if decision.refund_amount + decision.restocking_fee > total {
            let capped = total - decision.restocking_fee;
            tracing::warn!(
                "🛡️ {id}: refund + fee exceed total, refund {} → {capped}",
                decision.refund_amount
            );
            decision.refund_amount = capped;
        }

        if decision.eligible && days_since_delivery.is_some_and(|d| d > self.return_window_days) {
            tracing::warn!(
                "🛡️ {id}: approval overridden, {} days since delivery",
                days_since_delivery.unwrap_or_default()
            );
            decision.eligible = false;
            decision.reason = WINDOW_EXPIRED.into();
            decision.message = format!(
                "This order was delivered more than {} days ago and is no longer eligible for return.",
                self.return_window_days
            );
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::order;

    fn decision(eligible: bool, refund: f64, fee: f64) -> EligibilityDecision {
        EligibilityDecision {
            eligible,
            reason: "ok".into(),
            message: "ok".into(),
            refund_amount: refund,
            restocking_fee: fee,
        }
    }

    #[test]
    fn test_refund_above_total_is_clamped() {
        let o = order("ORD-2024-001", 100.0, Some("2024-01-01"));
        let d = DecisionGuard::new(30).review(decision(true, 250.0, 0.0), &o, Some(5));
        assert!(d.eligible);
        assert_eq!(d.refund_amount, 100.0);
    }

    #[test]
    fn test_negative_amounts_floor_at_zero() {
        let o = order("ORD-2024-001", 100.0, None);
        let d = DecisionGuard::new(30).review(decision(true, -10.0, -5.0), &o, None);
        assert_eq!(d.refund_amount, 0.0);
        assert_eq!(d.restocking_fee, 0.0);
    }

    #[test]
    fn test_refund_plus_fee_capped() {
        let o = order("ORD-2024-001", 100.0, None);
        let d = DecisionGuard::new(30).review(decision(true, 95.0, 15.0), &o, None);
        assert_eq!(d.restocking_fee, 15.0);
        assert_eq!(d.refund_amount, 85.0);
    }

    #[test]
    fn test_non_finite_values_fall_back() {
        let o = order("ORD-2024-001", 80.0, None);
        let d = DecisionGuard::new(30).review(decision(true, f64::NAN, f64::INFINITY), &o, None);
        assert_eq!(d.refund_amount, 80.0);
        assert_eq!(d.restocking_fee, 0.0);
    }

    #[test]
    fn test_approval_past_window_overridden() {
        let o = order("ORD-2024-001", 50.0, Some("2024-01-01"));
        let d = DecisionGuard::new(30).review(decision(true, 50.0, 0.0), &o, Some(45));
        assert!(!d.eligible);
        assert_eq!(d.reason, WINDOW_EXPIRED);
    }

    #[test]
    fn test_unknown_delivery_date_left_to_model() {
        let o = order("ORD-2024-001", 50.0, None);
        let d = DecisionGuard::new(30).review(decision(true, 20.0, 5.0), &o, None);
        assert!(d.eligible);
        assert_eq!(d.refund_amount, 20.0);
        assert_eq!(d.reason, "ok");
    }
}
