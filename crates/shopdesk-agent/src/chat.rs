//! Chat turn: classify → retrieve → answer.

use chrono::Utc;
use serde::Serialize;

use shopdesk_core::error::{Result, ShopDeskError};

use crate::answer::AnswerGenerator;
use crate::classifier::{Domain, QueryClassifier};
use crate::retriever::ContextRetriever;

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub domains: Vec<Domain>,
    pub timestamp: String,
}

pub struct ChatService {
    classifier: QueryClassifier,
    retriever: ContextRetriever,
    answer: AnswerGenerator,
}

impl ChatService {
    pub fn new(classifier: QueryClassifier, retriever: ContextRetriever, answer: AnswerGenerator) -> Self {
        Self {
            classifier,
            retriever,
            answer,
        }
    }

    pub async fn handle(&self, message: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ShopDeskError::InvalidInput("Message is required".into()));
        }
        let classification = self.classifier.classify(message);
        let domains: Vec<Domain> = classification.matched.iter().copied().collect();
        tracing::info!(
            "💬 Chat: domains={:?} order={:?} customer={:?}",
            domains,
            classification.entities.order_id,
            classification.entities.customer_id
        );

        let context = self.retriever.retrieve(message, &classification).await;
        let response = self.answer.answer(message, &context).await;
        Ok(ChatReply {
            response,
            domains,
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}
