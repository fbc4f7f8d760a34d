//! Application startup and lifecycle management.

use crate::config::ChatConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiChatProvider, GeminiConfig, GeminiImageProvider};
use crate::services::providers::{ChatProvider, ImageProvider};
use crate::services::{ChatService, ImageGenerator, ImageStore, SessionRegistry, TurnStore};
use axum::{
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    pub store: TurnStore,
    pub chat: Arc<ChatService>,
    pub sessions: SessionRegistry,
}

/// Build the API router over the given state.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/status", get(handlers::service_status))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:session_id", get(handlers::get_session))
        .route("/sessions/:session_id/messages", post(handlers::post_message))
        .route(
            "/sessions/:session_id/settings",
            put(handlers::update_settings),
        )
        .route("/sessions/:session_id/clear", post(handlers::clear_history))
        .route("/sessions/:session_id/history", get(handlers::get_history))
        .route("/sessions/:session_id/images", get(handlers::get_images))
        .route("/sessions/:session_id/records", get(handlers::get_records))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration. Optional
    /// backends (Gemini key, MongoDB) degrade with a logged warning instead
    /// of failing the build.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let store = TurnStore::connect(config.mongodb.uri.as_deref(), &config.mongodb.database).await;
        if !store.is_connected() {
            tracing::warn!("Running without chat transcript persistence");
        }

        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not configured; chat and image generation are disabled");
        }

        let chat_provider: Arc<dyn ChatProvider> = Arc::new(GeminiChatProvider::new(GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.chat_model.clone(),
        }));
        tracing::info!(
            model = %config.gemini.chat_model,
            "Initialized Gemini chat provider"
        );

        let image_provider: Arc<dyn ImageProvider> =
            Arc::new(GeminiImageProvider::new(GeminiConfig {
                api_key: config.gemini.api_key.clone(),
                model: config.gemini.image_model.clone(),
            }));

        let image_store = ImageStore::new(&config.storage.image_dir).await.map_err(|e| {
            tracing::error!(
                "Failed to initialize image store at {}: {}",
                config.storage.image_dir,
                e
            );
            e
        })?;
        let images = ImageGenerator::new(image_provider, image_store);

        let chat = Arc::new(ChatService::new(
            chat_provider,
            images,
            store.clone(),
            config.gemini.chat_model.clone(),
            config.gemini.image_model.clone(),
        ));

        let state = AppState {
            config: config.clone(),
            store,
            chat,
            sessions: SessionRegistry::new(),
        };

        let app = app_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> &TurnStore {
        &self.state.store
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
