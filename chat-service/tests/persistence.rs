//! Transcript store tests.
//!
//! The Mongo-backed tests require a MongoDB instance (TEST_MONGODB_URI,
//! defaulting to localhost) and are skipped when SKIP_MONGO_TESTS is set or
//! the server is unreachable.

use chat_service::models::ChatRecord;
use chat_service::services::TurnStore;

fn record(session_id: &str, user: &str, bot: &str) -> ChatRecord {
    ChatRecord::new(
        session_id.to_string(),
        user,
        bot,
        "web",
        "unknown",
        "gemini-1.5-pro",
    )
}

#[tokio::test]
async fn disconnected_store_append_returns_false() {
    let store = TurnStore::disconnected();
    assert!(!store.is_connected());

    let appended = store
        .append_turn(record("s-1", "hi", "hello"))
        .await
        .expect("append must not fail on a disconnected store");
    assert!(!appended);
}

#[tokio::test]
async fn disconnected_store_history_is_empty() {
    let store = TurnStore::disconnected();
    let history = store
        .fetch_history("s-1")
        .await
        .expect("fetch must not fail on a disconnected store");
    assert!(history.is_empty());
}

#[tokio::test]
async fn missing_uri_yields_disconnected_store() {
    let store = TurnStore::connect(None, "chat_test_db").await;
    assert!(!store.is_connected());
}

async fn connect_test_store() -> Option<TurnStore> {
    if std::env::var("SKIP_MONGO_TESTS").is_ok() {
        eprintln!("Skipping test: SKIP_MONGO_TESTS is set");
        return None;
    }

    let uri = std::env::var("TEST_MONGODB_URI").unwrap_or_else(|_| {
        "mongodb://localhost:27017/?serverSelectionTimeoutMS=2000".to_string()
    });
    let database = format!("chat_test_{}", uuid::Uuid::new_v4().simple());
    let store = TurnStore::connect(Some(uri.as_str()), &database).await;

    if store.health_check().await.is_err() {
        eprintln!("Skipping test: MongoDB not reachable");
        return None;
    }
    Some(store)
}

#[tokio::test]
async fn append_and_fetch_history_roundtrip() {
    let Some(store) = connect_test_store().await else {
        return;
    };
    assert!(store.is_connected());

    let first = store
        .append_turn(record("s-1", "first question", "first answer"))
        .await
        .expect("append");
    assert!(first);

    let second = store
        .append_turn(record("s-1", "second question", "second answer"))
        .await
        .expect("append");
    assert!(second);

    let history = store.fetch_history("s-1").await.expect("fetch");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].user_message, "first question");
    assert_eq!(history[0].bot_response, "first answer");
    assert_eq!(history[1].user_message, "second question");
    assert!(history[0].timestamp <= history[1].timestamp);
}

#[tokio::test]
async fn history_is_scoped_to_the_session() {
    let Some(store) = connect_test_store().await else {
        return;
    };

    store
        .append_turn(record("s-a", "hello", "hi"))
        .await
        .expect("append");

    let other = store.fetch_history("s-b").await.expect("fetch");
    assert!(other.is_empty());
}
