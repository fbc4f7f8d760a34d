//! Remote model provider abstractions and implementations.
//!
//! This module provides a trait-based abstraction for the chat and
//! image-generation backends, allowing easy swapping between the real
//! Gemini API and mocks.

pub mod gemini;
pub mod mock;

use crate::models::RemoteTurn;
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Generation parameters for model requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Nucleus-sampling bound.
    pub top_p: Option<f32>,

    /// Top-k sampling bound.
    pub top_k: Option<i32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,

    /// Requested response modalities (image generation only).
    pub response_modalities: Vec<String>,
}

impl GenerationParams {
    /// Fixed parameters for chat completions.
    pub fn chat(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            top_p: Some(0.95),
            top_k: Some(40),
            max_tokens: Some(8192),
            response_modalities: Vec::new(),
        }
    }

    /// Fixed parameters for image generation: both image and text
    /// modalities, streamed.
    pub fn image() -> Self {
        Self {
            temperature: Some(1.0),
            top_p: Some(0.95),
            top_k: Some(40),
            max_tokens: Some(8192),
            response_modalities: vec!["image".to_string(), "text".to_string()],
        }
    }
}

/// A chunk of a streamed image-generation response.
#[derive(Debug, Clone)]
pub enum ImageChunk {
    /// Inline binary payload. The data may be base64 text or raw bytes;
    /// the consumer decides by trial decode.
    Image { mime_type: String, data: Vec<u8> },

    /// Informational text interleaved with the image payload.
    Text(String),
}

/// Type alias for image-generation streams.
pub type ImageStream = Pin<Box<dyn Stream<Item = Result<ImageChunk, ProviderError>> + Send>>;

/// Trait for conversational completion providers (e.g. Gemini).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one completion over the full remote conversation, returning the
    /// assistant text.
    async fn complete(
        &self,
        turns: &[RemoteTurn],
        params: &GenerationParams,
    ) -> Result<String, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Trait for streamed image-generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Open a streamed generation call for the given prompt.
    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ImageStream, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
