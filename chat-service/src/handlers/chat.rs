use crate::dtos::{
    HistoryResponse, ImagesResponse, MessageResponse, PostMessageRequest, RecordsResponse,
    SessionResponse, UpdateSettingsRequest,
};
use crate::models::ChatSession;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;
use validator::Validate;

/// Allocate a fresh session with default settings.
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.sessions.create();
    tracing::info!(session_id = %session.session_id, "Session created");
    (StatusCode::CREATED, Json(SessionResponse::from(&session)))
}

/// Current settings for a session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = lookup(&state, &session_id)?;

    let session = entry.lock().await;
    Ok(Json(SessionResponse::from(&*session)))
}

/// Run one conversation turn.
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let entry = lookup(&state, &session_id)?;
    let client_addr = client_addr(&headers);

    let mut session = entry.lock().await;
    let outcome = state
        .chat
        .handle_user_message(&mut session, &payload.text, &client_addr)
        .await;

    Ok(Json(MessageResponse {
        reply: outcome.reply,
        image_path: outcome.image_path,
    }))
}

/// Apply persona/verbosity settings. Display history is untouched.
pub async fn update_settings(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = lookup(&state, &session_id)?;

    let mut session = entry.lock().await;
    state
        .chat
        .apply_settings(&mut session, payload.persona, payload.verbosity)
        .await;

    tracing::info!(
        session_id = %session.session_id,
        persona = ?session.persona,
        verbosity = ?session.verbosity,
        "Settings applied"
    );
    Ok(Json(SessionResponse::from(&*session)))
}

/// Wipe the in-memory display history.
pub async fn clear_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = lookup(&state, &session_id)?;

    let mut session = entry.lock().await;
    session.clear_history();
    tracing::info!(session_id = %session.session_id, "Display history cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// In-memory display history for the session.
pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = lookup(&state, &session_id)?;

    let session = entry.lock().await;
    Ok(Json(HistoryResponse {
        turns: session.history.clone(),
    }))
}

/// Generated-image records for the session.
pub async fn get_images(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = lookup(&state, &session_id)?;

    let session = entry.lock().await;
    Ok(Json(ImagesResponse {
        images: session.images.clone(),
    }))
}

/// Persisted transcript records, ascending by timestamp. Empty when the
/// store is disconnected.
pub async fn get_records(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // The transcript outlives the in-memory session, so no lookup here.
    let records = state.store.fetch_history(&session_id).await?;
    Ok(Json(RecordsResponse { records }))
}

fn lookup(state: &AppState, session_id: &str) -> Result<Arc<Mutex<ChatSession>>, AppError> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Unknown session: {}", session_id)))
}

fn client_addr(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
