use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{ChatId, MessageId, OwnerId};
use crate::render::Reply;

/// A chat update as classified by the gateway.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InboundEvent {
    pub chat_id: ChatId,
    pub sender_id: OwnerId,
    /// Message the event belongs to; for button presses, the message holding the button.
    pub message_id: Option<MessageId>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundKind {
    Text { text: String },
    Photo { file_ref: String },
    Action { payload: String },
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventReplies {
    pub replies: Vec<Reply>,
}
