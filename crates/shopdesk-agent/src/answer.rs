//! Answer generation.

use std::sync::Arc;

use shopdesk_core::traits::ChatProvider;
use shopdesk_core::types::{CompletionParams, Message};

pub const APOLOGY: &str = "I apologize, but I could not process your request at this time.";

/// System instruction with the retrieved context appended verbatim.
pub fn system_prompt(context: &str) -> String {
    format!(
        "You are an intelligent e-commerce AI assistant for an online retail platform.
You help customers with:
- Order tracking and status updates
- Return and refund requests
- Product information and recommendations
- Shipping and delivery questions
- Policy clarifications (return policy, warranty, etc.)

Use the following context information when available:
{context}

Be helpful, professional, and concise. If you don't have specific information, guide the user on how to get it.
Always prioritize customer satisfaction and provide actionable next steps."
    )
}

pub struct AnswerGenerator {
    chat: Arc<dyn ChatProvider>,
    params: CompletionParams,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatProvider>, params: CompletionParams) -> Self {
        Self { chat, params }
    }

    /// One completion over system prompt + user message. Never fails.
    pub async fn answer(&self, message: &str, context: &str) -> String {
        let messages = [Message::system(system_prompt(context)), Message::user(message)];
        match self.chat.complete(&messages, &self.params).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!("⚠️ {} returned an empty completion", self.chat.name());
                APOLOGY.to_string()
            }
            Err(e) => {
                tracing::error!("❌ Completion failed: {e}");
                APOLOGY.to_string()
            }
        }
    }
}
