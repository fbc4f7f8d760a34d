//! Session state: persona/verbosity settings, display history, generated
//! images, and the cached remote conversation handle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog of chat personas, each mapping to a fixed system instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Persona {
    #[default]
    #[serde(rename = "Basic Assistant")]
    BasicAssistant,
    #[serde(rename = "Technical Expert")]
    TechnicalExpert,
    #[serde(rename = "Creative Writer")]
    CreativeWriter,
    #[serde(rename = "Professional Consultant")]
    ProfessionalConsultant,
}

impl Persona {
    /// The system instruction this persona prepends to the conversation.
    pub fn instruction(&self) -> &'static str {
        match self {
            Persona::BasicAssistant => {
                "You are a helpful, friendly AI assistant. Be concise and clear in your responses."
            }
            Persona::TechnicalExpert => {
                "You are a technical expert AI with deep knowledge of programming and computer science. Provide detailed technical answers with code examples when appropriate."
            }
            Persona::CreativeWriter => {
                "You are a creative AI writer with a flair for engaging, descriptive language. Be imaginative and inspiring in your responses."
            }
            Persona::ProfessionalConsultant => {
                "You are a professional consultant AI with a formal, business-oriented communication style. Provide structured, analytical responses."
            }
        }
    }
}

/// How detailed the assistant's replies should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Verbosity {
    Concise,
    #[default]
    Standard,
    Detailed,
}

impl Verbosity {
    /// Literal clause appended to the persona instruction. Empty for
    /// `Standard`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Verbosity::Concise => " Keep your responses very brief and to the point.",
            Verbosity::Standard => "",
            Verbosity::Detailed => " Provide detailed, comprehensive responses.",
        }
    }
}

/// Assemble the system context for a persona/verbosity pair.
///
/// Pure concatenation: exactly one persona instruction plus at most one
/// verbosity suffix.
pub fn build_context(persona: Persona, verbosity: Verbosity) -> String {
    let mut context = persona.instruction().to_string();
    context.push_str(verbosity.suffix());
    context
}

/// Role of a turn in the display history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the session's display history. Turns are appended or
/// wholly cleared, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Role of a message in the remote conversation (the model API uses
/// "user"/"model").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteRole {
    User,
    Model,
}

impl RemoteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteRole::User => "user",
            RemoteRole::Model => "model",
        }
    }
}

/// One message in the remote conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTurn {
    pub role: RemoteRole,
    pub text: String,
}

impl RemoteTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: RemoteRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: RemoteRole::Model,
            text: text.into(),
        }
    }
}

/// An established remote conversation: the priming context plus every
/// exchange sent against it. Reused across turns until the settings change.
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    context: String,
    temperature: f32,
    turns: Vec<RemoteTurn>,
}

impl ConversationHandle {
    /// A fresh handle whose first turn is the priming instruction.
    pub fn new(context: impl Into<String>, temperature: f32) -> Self {
        let context = context.into();
        let turns = vec![RemoteTurn::user(context.clone())];
        Self {
            context,
            temperature,
            turns,
        }
    }

    /// Whether this handle was established for the given context and
    /// temperature.
    pub fn matches(&self, context: &str, temperature: f32) -> bool {
        self.context == context && self.temperature.to_bits() == temperature.to_bits()
    }

    pub fn turns(&self) -> &[RemoteTurn] {
        &self.turns
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(RemoteTurn::user(text));
    }

    pub fn push_model(&mut self, text: impl Into<String>) {
        self.turns.push(RemoteTurn::model(text));
    }
}

/// A generated image artifact, held in session memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub path: String,
    pub prompt: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Per-session state. The session id is allocated once and never changes;
/// everything else mutates as the conversation proceeds.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub session_id: String,
    pub persona: Persona,
    pub verbosity: Verbosity,
    pub history: Vec<ChatTurn>,
    pub images: Vec<GeneratedImage>,
    image_seq: u32,
    handle: Option<ConversationHandle>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            persona: Persona::default(),
            verbosity: Verbosity::default(),
            history: Vec::new(),
            images: Vec::new(),
            image_seq: 0,
            handle: None,
        }
    }

    /// The system context for the session's current settings.
    pub fn context(&self) -> String {
        build_context(self.persona, self.verbosity)
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatTurn {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    /// Wipe the display history. Settings, images, and the conversation
    /// handle are untouched.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn handle(&self) -> Option<&ConversationHandle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut ConversationHandle> {
        self.handle.as_mut()
    }

    pub fn set_handle(&mut self, handle: ConversationHandle) {
        self.handle = Some(handle);
    }

    /// Next value of the per-session image counter.
    pub fn next_image_seq(&mut self) -> u32 {
        self.image_seq += 1;
        self.image_seq
    }

    pub fn record_image(&mut self, path: String, prompt: impl Into<String>) {
        self.images.push(GeneratedImage {
            path,
            prompt: prompt.into(),
            created_at: Utc::now(),
        });
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_context_is_deterministic() {
        let first = build_context(Persona::TechnicalExpert, Verbosity::Concise);
        let second = build_context(Persona::TechnicalExpert, Verbosity::Concise);
        assert_eq!(first, second);
    }

    #[test]
    fn standard_verbosity_adds_no_suffix() {
        assert_eq!(
            build_context(Persona::BasicAssistant, Verbosity::Standard),
            "You are a helpful, friendly AI assistant. Be concise and clear in your responses."
        );
    }

    #[test]
    fn concise_verbosity_appends_brevity_clause() {
        let context = build_context(Persona::CreativeWriter, Verbosity::Concise);
        assert!(context.starts_with(Persona::CreativeWriter.instruction()));
        assert!(context.ends_with(" Keep your responses very brief and to the point."));
    }

    #[test]
    fn new_session_uses_defaults() {
        let session = ChatSession::new();
        assert_eq!(session.persona, Persona::BasicAssistant);
        assert_eq!(session.verbosity, Verbosity::Standard);
        assert!(session.history.is_empty());
        assert!(session.images.is_empty());
        assert!(session.handle().is_none());
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(ChatSession::new().session_id, ChatSession::new().session_id);
    }

    #[test]
    fn changing_settings_invalidates_the_handle_key() {
        let mut session = ChatSession::new();
        session.set_handle(ConversationHandle::new(session.context(), 0.9));

        session.persona = Persona::ProfessionalConsultant;
        session.verbosity = Verbosity::Detailed;

        let handle = session.handle().expect("handle still present");
        assert!(!handle.matches(&session.context(), 0.9));
    }

    #[test]
    fn clear_history_keeps_settings_and_images() {
        let mut session = ChatSession::new();
        session.persona = Persona::TechnicalExpert;
        session.push_user("hello");
        session.push_assistant("hi");
        session.record_image("img.png".to_string(), "a cat");

        session.clear_history();

        assert!(session.history.is_empty());
        assert_eq!(session.persona, Persona::TechnicalExpert);
        assert_eq!(session.images.len(), 1);
    }

    #[test]
    fn handle_matches_on_context_and_temperature() {
        let handle = ConversationHandle::new("ctx", 0.9);
        assert!(handle.matches("ctx", 0.9));
        assert!(!handle.matches("ctx", 1.0));
        assert!(!handle.matches("other", 0.9));
    }

    #[test]
    fn new_handle_starts_with_priming_turn() {
        let handle = ConversationHandle::new("instructions", 0.9);
        assert_eq!(handle.turns(), &[RemoteTurn::user("instructions")]);
    }

    #[test]
    fn image_seq_is_monotonic() {
        let mut session = ChatSession::new();
        assert_eq!(session.next_image_seq(), 1);
        assert_eq!(session.next_image_seq(), 2);
        assert_eq!(session.next_image_seq(), 3);
    }

    #[test]
    fn persona_names_round_trip_through_serde() {
        let json = serde_json::to_string(&Persona::TechnicalExpert).unwrap();
        assert_eq!(json, "\"Technical Expert\"");
        let parsed: Persona = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Persona::TechnicalExpert);
    }

    #[test]
    fn unknown_persona_is_rejected() {
        assert!(serde_json::from_str::<Persona>("\"Wizard\"").is_err());
    }
}
