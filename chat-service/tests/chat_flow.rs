//! Conversation-flow tests driven by mock providers.

use chat_service::models::{ChatSession, Persona, Role, Verbosity};
use chat_service::services::providers::mock::{MockChatProvider, MockImageProvider};
use chat_service::services::providers::{ChatProvider, ImageChunk, ImageProvider};
use chat_service::services::{ChatService, ImageGenerator, ImageStore, TurnStore};
use std::sync::Arc;
use tempfile::TempDir;

const BASIC_CONTEXT: &str =
    "You are a helpful, friendly AI assistant. Be concise and clear in your responses.";

const APOLOGY_REPLY: &str = "I encountered an error processing your request. Please try again.";

/// 1x1 PNG, base64-encoded the way the API delivers inline data.
const PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

struct TestHarness {
    chat: Arc<MockChatProvider>,
    image: Arc<MockImageProvider>,
    service: ChatService,
    _image_dir: TempDir,
}

async fn harness(chat_enabled: bool, image_script: Vec<ImageChunk>) -> TestHarness {
    let chat = Arc::new(MockChatProvider::new(chat_enabled));
    let image = Arc::new(MockImageProvider::new(true, image_script));
    let image_dir = tempfile::tempdir().expect("temp dir");
    let store = ImageStore::new(image_dir.path())
        .await
        .expect("image store");
    let generator = ImageGenerator::new(image.clone() as Arc<dyn ImageProvider>, store);
    let service = ChatService::new(
        chat.clone() as Arc<dyn ChatProvider>,
        generator,
        TurnStore::disconnected(),
        "gemini-1.5-pro".to_string(),
        "gemini-2.0-flash-exp-image-generation".to_string(),
    );
    TestHarness {
        chat,
        image,
        service,
        _image_dir: image_dir,
    }
}

fn png_chunk() -> ImageChunk {
    ImageChunk::Image {
        mime_type: "image/png".to_string(),
        data: PNG_BASE64.as_bytes().to_vec(),
    }
}

#[tokio::test]
async fn ordinary_message_primes_then_completes() {
    let harness = harness(true, Vec::new()).await;
    let mut session = ChatSession::new();

    let outcome = harness
        .service
        .handle_user_message(&mut session, "What is 2+2?", "unknown")
        .await;

    assert_eq!(outcome.reply, "Mock response for: What is 2+2?");
    assert!(outcome.image_path.is_none());

    let calls = harness.chat.calls();
    assert_eq!(calls.len(), 2, "one priming call plus one completion");
    assert_eq!(calls[0].len(), 1);
    assert_eq!(calls[0][0].text, BASIC_CONTEXT);
    assert_eq!(calls[1].last().unwrap().text, "What is 2+2?");

    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[0].role, Role::User);
    assert_eq!(session.history[0].content, "What is 2+2?");
    assert_eq!(session.history[1].role, Role::Assistant);
    assert_eq!(session.history[1].content, outcome.reply);
}

#[tokio::test]
async fn second_message_reuses_the_primed_handle() {
    let harness = harness(true, Vec::new()).await;
    let mut session = ChatSession::new();

    harness
        .service
        .handle_user_message(&mut session, "first", "unknown")
        .await;
    harness
        .service
        .handle_user_message(&mut session, "second", "unknown")
        .await;

    let calls = harness.chat.calls();
    assert_eq!(calls.len(), 3, "priming happens once, not per message");
    // The second completion carries the full remote history.
    assert_eq!(calls[2].len(), 5);
    assert_eq!(calls[2][0].text, BASIC_CONTEXT);
    assert_eq!(calls[2].last().unwrap().text, "second");
}

#[tokio::test]
async fn settings_change_reprimes_once_per_application() {
    let harness = harness(true, Vec::new()).await;
    let mut session = ChatSession::new();

    harness
        .service
        .apply_settings(&mut session, Persona::TechnicalExpert, Verbosity::Concise)
        .await;
    harness
        .service
        .apply_settings(&mut session, Persona::CreativeWriter, Verbosity::Detailed)
        .await;

    let calls = harness.chat.calls();
    assert_eq!(calls.len(), 2, "each application primes exactly once");
    assert!(calls[0][0].text.starts_with(Persona::TechnicalExpert.instruction()));
    assert!(calls[1][0].text.starts_with(Persona::CreativeWriter.instruction()));

    // The next message runs against the latest context only.
    harness
        .service
        .handle_user_message(&mut session, "hello", "unknown")
        .await;
    let calls = harness.chat.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[2][0].text.starts_with(Persona::CreativeWriter.instruction()));
    assert!(calls[2][0].text.ends_with(" Provide detailed, comprehensive responses."));
}

#[tokio::test]
async fn reapplying_identical_settings_reuses_the_handle() {
    let harness = harness(true, Vec::new()).await;
    let mut session = ChatSession::new();

    harness
        .service
        .apply_settings(&mut session, Persona::TechnicalExpert, Verbosity::Concise)
        .await;
    harness
        .service
        .apply_settings(&mut session, Persona::TechnicalExpert, Verbosity::Concise)
        .await;

    assert_eq!(harness.chat.call_count(), 1, "identical key is a cache hit");
}

#[tokio::test]
async fn settings_change_keeps_display_history() {
    let harness = harness(true, Vec::new()).await;
    let mut session = ChatSession::new();

    harness
        .service
        .handle_user_message(&mut session, "hello", "unknown")
        .await;
    harness
        .service
        .apply_settings(&mut session, Persona::ProfessionalConsultant, Verbosity::Standard)
        .await;

    assert_eq!(session.history.len(), 2);
    assert_eq!(session.persona, Persona::ProfessionalConsultant);
}

#[tokio::test]
async fn image_directive_routes_to_adapter_not_chat() {
    let harness = harness(true, vec![png_chunk()]).await;
    let mut session = ChatSession::new();

    harness
        .service
        .apply_settings(&mut session, Persona::TechnicalExpert, Verbosity::Concise)
        .await;
    let calls_before = harness.chat.call_count();

    let outcome = harness
        .service
        .handle_user_message(&mut session, "generate image: a red bicycle", "unknown")
        .await;

    assert_eq!(
        harness.chat.call_count(),
        calls_before,
        "no chat-completion call for an image turn"
    );
    assert_eq!(harness.image.prompts(), vec!["a red bicycle".to_string()]);

    assert!(outcome.reply.contains("a red bicycle"));
    assert!(outcome.reply.contains("Generated Images"));
    assert!(outcome.image_path.is_some());

    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[0].content, "generate image: a red bicycle");
    assert_eq!(session.history[1].content, outcome.reply);

    assert_eq!(session.images.len(), 1);
    assert_eq!(session.images[0].prompt, "a red bicycle");
}

#[tokio::test]
async fn failed_image_generation_appends_failure_turn_without_record() {
    let harness = harness(true, vec![ImageChunk::Text("sorry".to_string())]).await;
    let mut session = ChatSession::new();

    let outcome = harness
        .service
        .handle_user_message(&mut session, "create image: a unicorn", "unknown")
        .await;

    assert!(outcome.image_path.is_none());
    assert!(outcome.reply.contains("couldn't generate an image"));
    assert_eq!(session.history.len(), 2);
    assert!(session.images.is_empty());
}

#[tokio::test]
async fn provider_failure_becomes_an_apology_turn() {
    let harness = harness(false, Vec::new()).await;
    let mut session = ChatSession::new();

    let outcome = harness
        .service
        .handle_user_message(&mut session, "hello", "unknown")
        .await;

    assert_eq!(outcome.reply, APOLOGY_REPLY);
    assert_eq!(session.history.len(), 2);
    assert_eq!(session.history[1].content, APOLOGY_REPLY);
}

#[tokio::test]
async fn replies_are_trimmed() {
    let harness = harness(true, Vec::new()).await;
    let mut session = ChatSession::new();

    let outcome = harness
        .service
        .handle_user_message(&mut session, "hello   ", "unknown")
        .await;

    assert!(!outcome.reply.ends_with(char::is_whitespace));
}

#[tokio::test]
async fn non_directive_messages_always_use_the_chat_path() {
    let harness = harness(true, vec![png_chunk()]).await;
    let mut session = ChatSession::new();

    for text in ["please generate image: x", "an image: of what", "2+2?"] {
        harness
            .service
            .handle_user_message(&mut session, text, "unknown")
            .await;
    }

    assert!(harness.image.prompts().is_empty());
    // One priming call plus one completion per message.
    assert_eq!(harness.chat.call_count(), 4);
}

#[tokio::test]
async fn image_counter_increments_across_turns() {
    let harness = harness(true, vec![png_chunk()]).await;
    let mut session = ChatSession::new();

    let first = harness
        .service
        .handle_user_message(&mut session, "generate image: one", "unknown")
        .await;
    let second = harness
        .service
        .handle_user_message(&mut session, "generate image: two", "unknown")
        .await;

    let first = first.image_path.unwrap();
    let second = second.image_path.unwrap();
    assert_ne!(first, second);
    assert!(first.ends_with("generated_image_1.png"));
    assert!(second.ends_with("generated_image_2.png"));
}
