//! Conversation turn handling: directive routing, remote context
//! management, and best-effort transcript persistence.

use crate::models::{ChatRecord, ChatSession, ConversationHandle, Persona, RemoteTurn, Verbosity};
use crate::services::database::TurnStore;
use crate::services::imagen::ImageGenerator;
use crate::services::providers::{ChatProvider, GenerationParams, ProviderError};
use std::sync::Arc;

/// Sampling temperature used for every chat conversation.
pub const CHAT_TEMPERATURE: f32 = 0.9;

/// Platform tag written into every persisted chat record.
const PLATFORM: &str = "web";

/// Reply shown when a remote call fails. Failures never propagate past the
/// turn boundary.
const APOLOGY_REPLY: &str = "I encountered an error processing your request. Please try again.";

/// Reply shown when image generation yields no artifact.
const IMAGE_FAILURE_REPLY: &str =
    "I couldn't generate an image for that prompt. Please try again with a different description.";

const IMAGE_DIRECTIVE_PREFIXES: [&str; 2] = ["generate image:", "create image:"];

/// Extract an image prompt if the input starts with a recognized directive
/// (case-insensitive). The prompt is the trimmed remainder after the first
/// colon.
pub fn parse_image_directive(input: &str) -> Option<&str> {
    let lowered = input.to_ascii_lowercase();
    IMAGE_DIRECTIVE_PREFIXES
        .iter()
        .find(|prefix| lowered.starts_with(*prefix))
        .map(|prefix| input[prefix.len()..].trim())
}

/// Result of one conversation turn. Always displayable: error paths produce
/// a fixed-template reply instead of a fault.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub image_path: Option<String>,
}

pub struct ChatService {
    chat_provider: Arc<dyn ChatProvider>,
    images: ImageGenerator,
    store: TurnStore,
    chat_model: String,
    image_model: String,
}

impl ChatService {
    pub fn new(
        chat_provider: Arc<dyn ChatProvider>,
        images: ImageGenerator,
        store: TurnStore,
        chat_model: String,
        image_model: String,
    ) -> Self {
        Self {
            chat_provider,
            images,
            store,
            chat_model,
            image_model,
        }
    }

    /// Run one conversation turn against the session. Routes image
    /// directives to the generation adapter, everything else to the chat
    /// backend.
    pub async fn handle_user_message(
        &self,
        session: &mut ChatSession,
        raw_text: &str,
        client_addr: &str,
    ) -> TurnOutcome {
        match parse_image_directive(raw_text) {
            Some(prompt) => {
                let prompt = prompt.to_string();
                self.image_turn(session, raw_text, &prompt, client_addr).await
            }
            None => self.chat_turn(session, raw_text, client_addr).await,
        }
    }

    /// Apply new settings: display history is kept, and the cached
    /// conversation handle is replaced with a freshly primed one unless the
    /// resulting (context, temperature) key is unchanged.
    pub async fn apply_settings(
        &self,
        session: &mut ChatSession,
        persona: Persona,
        verbosity: Verbosity,
    ) {
        session.persona = persona;
        session.verbosity = verbosity;
        if let Err(e) = self.start_or_reuse_handle(session).await {
            tracing::warn!(
                error = %e,
                session_id = %session.session_id,
                "Failed to prime conversation after settings change"
            );
        }
    }

    async fn chat_turn(
        &self,
        session: &mut ChatSession,
        raw_text: &str,
        client_addr: &str,
    ) -> TurnOutcome {
        session.push_user(raw_text);

        match self.chat_reply(session, raw_text).await {
            Ok(reply) => {
                session.push_assistant(reply.clone());
                self.persist_turn(
                    session.session_id.clone(),
                    raw_text,
                    &reply,
                    client_addr,
                    self.chat_model.clone(),
                );
                TurnOutcome {
                    reply,
                    image_path: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    session_id = %session.session_id,
                    "Chat completion failed"
                );
                session.push_assistant(APOLOGY_REPLY);
                TurnOutcome {
                    reply: APOLOGY_REPLY.to_string(),
                    image_path: None,
                }
            }
        }
    }

    async fn image_turn(
        &self,
        session: &mut ChatSession,
        raw_text: &str,
        prompt: &str,
        client_addr: &str,
    ) -> TurnOutcome {
        session.push_user(raw_text);
        let seq = session.next_image_seq();

        match self.images.generate(&session.session_id, seq, prompt).await {
            Some(path) => {
                let path = path.to_string_lossy().to_string();
                let reply = format!(
                    "I've generated an image based on your prompt: \"{}\". You can view it in the Generated Images gallery.",
                    prompt
                );
                session.push_assistant(reply.clone());
                session.record_image(path.clone(), prompt);
                self.persist_turn(
                    session.session_id.clone(),
                    raw_text,
                    &reply,
                    client_addr,
                    self.image_model.clone(),
                );
                TurnOutcome {
                    reply,
                    image_path: Some(path),
                }
            }
            None => {
                session.push_assistant(IMAGE_FAILURE_REPLY);
                TurnOutcome {
                    reply: IMAGE_FAILURE_REPLY.to_string(),
                    image_path: None,
                }
            }
        }
    }

    /// Send one message against the session's conversation handle, priming
    /// a new remote conversation first if the settings changed.
    async fn chat_reply(
        &self,
        session: &mut ChatSession,
        text: &str,
    ) -> Result<String, ProviderError> {
        self.start_or_reuse_handle(session).await?;

        let params = GenerationParams::chat(CHAT_TEMPERATURE);
        let Some(handle) = session.handle_mut() else {
            return Err(ProviderError::NotConfigured(
                "Conversation handle unavailable".to_string(),
            ));
        };

        // The handle is only extended once the remote call succeeds, so a
        // failed turn leaves the remote history consistent.
        let mut turns = handle.turns().to_vec();
        turns.push(RemoteTurn::user(text));

        let reply = self.chat_provider.complete(&turns, &params).await?;
        let reply = reply.trim().to_string();

        handle.push_user(text);
        handle.push_model(reply.clone());
        Ok(reply)
    }

    /// Ensure the session has a live handle for its current context,
    /// priming a new remote conversation on cache miss. Reuse requires the
    /// same context string and temperature.
    async fn start_or_reuse_handle(&self, session: &mut ChatSession) -> Result<(), ProviderError> {
        let context = session.context();
        let reusable = session
            .handle()
            .map(|handle| handle.matches(&context, CHAT_TEMPERATURE))
            .unwrap_or(false);
        if reusable {
            return Ok(());
        }

        let mut handle = ConversationHandle::new(context, CHAT_TEMPERATURE);
        let params = GenerationParams::chat(CHAT_TEMPERATURE);
        let ack = self
            .chat_provider
            .complete(handle.turns(), &params)
            .await?;
        handle.push_model(ack);

        tracing::debug!(
            session_id = %session.session_id,
            "Primed new remote conversation"
        );
        session.set_handle(handle);
        Ok(())
    }

    /// Fire-and-forget write of a completed turn pair. Runs after the
    /// display history is updated and never blocks the reply path.
    fn persist_turn(
        &self,
        session_id: String,
        user_message: &str,
        bot_response: &str,
        client_addr: &str,
        model: String,
    ) {
        let store = self.store.clone();
        let record = ChatRecord::new(
            session_id,
            user_message,
            bot_response,
            PLATFORM,
            client_addr,
            &model,
        );

        tokio::spawn(async move {
            match store.append_turn(record).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("Chat record skipped: transcript store disconnected")
                }
                Err(e) => tracing::warn!(error = %e, "Failed to persist chat record"),
            }
        });
    }
}
