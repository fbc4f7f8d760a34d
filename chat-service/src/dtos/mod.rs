//! Request/response payloads for the chat API.

use crate::models::{ChatSession, ChatTurn, GeneratedImage, Persona, TurnRecord, Verbosity};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 8192, message = "message must be 1-8192 characters"))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub persona: Persona,
    pub verbosity: Verbosity,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub persona: Persona,
    pub verbosity: Verbosity,
}

impl From<&ChatSession> for SessionResponse {
    fn from(session: &ChatSession) -> Self {
        Self {
            session_id: session.session_id.clone(),
            persona: session.persona,
            verbosity: session.verbosity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub images: Vec<GeneratedImage>,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<TurnRecord>,
}

/// Degraded-mode banners for the UI.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub gemini_configured: bool,
    pub persistence_connected: bool,
}
