use serde::{ Deserialize, Serialize };

use super::chat::ChatMessage;

/// Body of `POST /api/chat`. Extra per-message fields such as `id` are ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}
