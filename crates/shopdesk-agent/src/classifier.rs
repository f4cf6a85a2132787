//! Keyword query classifier.
//!
//! Each domain matches independently on case-insensitive substrings, so adding
//! words to a message can only grow the matched set. Entity extraction runs
//! alongside and feeds the exact-match filters of the retriever.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

use shopdesk_core::error::{Result, ShopDeskError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Policy,
    Order,
    Customer,
    Product,
    Return,
}

impl Domain {
    /// Retrieval order.
    pub const ALL: [Domain; 5] = [
        Domain::Policy,
        Domain::Order,
        Domain::Customer,
        Domain::Product,
        Domain::Return,
    ];

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Policy => &["policy", "warranty", "exchange", "shipping", "faq", "guide"],
            Self::Order => &["order", "track", "status", "delivery", "pending"],
            Self::Customer => &[
                "customer", "email", "phone", "address", "contact", "name", "state", "city",
            ],
            Self::Product => &["product", "item", "price", "stock", "inventory"],
            Self::Return => &["return", "refund", "rma"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Order => "order",
            Self::Customer => "customer",
            Self::Product => "product",
            Self::Return => "return",
        }
    }
}

/// Identifiers pulled out of the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entities {
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    /// Two-letter state code, upper-case.
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Every domain whose keywords appear.
    pub matched: BTreeSet<Domain>,
    pub entities: Entities,
}

impl Classification {
    pub fn has(&self, domain: Domain) -> bool {
        self.matched.contains(&domain)
    }

    /// Domains to query. Policy questions that mention returns are answered
    /// from policy documents only.
    pub fn retrieval_domains(&self) -> BTreeSet<Domain> {
        let mut plan = self.matched.clone();
        if plan.contains(&Domain::Policy) {
            plan.remove(&Domain::Return);
        }
        plan
    }
}

pub struct QueryClassifier {
    order_id: Regex,
    customer_id: Regex,
    state_phrase: Regex,
    state_after_place: Regex,
    state_code: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ShopDeskError::Other(format!("Bad pattern {pattern}: {e}")))
}

impl QueryClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            order_id: compile(r"(?i)\bORD-\d{4}-\d{3}")?,
            customer_id: compile(r"(?i)\bCUST-\d{3}")?,
            state_phrase: compile(r"(?i)(?:address_state|state)\s+(?:is\s+)?([a-z]{2})\b")?,
            // any case after a place preposition: "customers in nv"
            state_after_place: compile(r"(?i)\b(?:in|from|near)\s+(CA|NY|TX|FL|NV|WA|OR|IL|PA|OH)\b")?,
            // bare codes only in capitals: "or", "oh", "in" are ordinary words
            state_code: compile(r"\b(CA|NY|TX|FL|NV|WA|OR|IL|PA|OH)\b")?,
        })
    }

    pub fn classify(&self, message: &str) -> Classification {
        let lower = message.to_lowercase();
        let matched = Domain::ALL
            .into_iter()
            .filter(|d| d.keywords().iter().any(|k| lower.contains(k)))
            .collect();

        let region = self
            .state_phrase
            .captures(message)
            .or_else(|| self.state_after_place.captures(message))
            .or_else(|| self.state_code.captures(message))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_uppercase());

        let classification = Classification {
            matched,
            entities: Entities {
                order_id: self.order_id.find(message).map(|m| m.as_str().to_uppercase()),
                customer_id: self.customer_id.find(message).map(|m| m.as_str().to_uppercase()),
                region,
            },
        };
        tracing::debug!(
            "🧭 Classified: {:?} entities={:?}",
            classification.matched,
            classification.entities
        );
        classification
    }
}
