//! Persisted chat records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed turn pair, written once and never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Session the turn belongs to.
    pub session_id: String,

    /// Server-clock creation time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// What the user sent.
    pub user_message: String,

    /// What the assistant replied.
    pub bot_response: String,

    /// Caller surface, e.g. "web".
    pub platform: String,

    /// Client address as reported by the caller.
    pub ip_address: String,

    /// Model that produced the reply.
    pub model: String,
}

impl ChatRecord {
    pub fn new(
        session_id: String,
        user_message: &str,
        bot_response: &str,
        platform: &str,
        ip_address: &str,
        model: &str,
    ) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            user_message: user_message.to_string(),
            bot_response: bot_response.to_string(),
            platform: platform.to_string(),
            ip_address: ip_address.to_string(),
            model: model.to_string(),
        }
    }
}

/// Projection returned by the per-session history query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub user_message: String,
    pub bot_response: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}
