//! Gemini AI provider implementation.
//!
//! Implements chat completion and streamed image generation using Google's
//! Gemini API.

use super::{
    ChatProvider, GenerationParams, ImageChunk, ImageProvider, ImageStream, ProviderError,
};
use crate::models::RemoteTurn;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider configuration. A missing API key leaves the provider in
/// a degraded state where every call fails with `NotConfigured`.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
}

fn http_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .expect("Failed to create HTTP client")
}

fn api_url(config: &GeminiConfig, api_key: &str, method: &str) -> String {
    format!(
        "{}/models/{}:{}?key={}",
        GEMINI_API_BASE, config.model, method, api_key
    )
}

/// Convert conversation turns to Gemini content entries.
fn turns_to_contents(turns: &[RemoteTurn]) -> Vec<Content> {
    turns
        .iter()
        .map(|turn| Content {
            role: Some(turn.role.as_str().to_string()),
            parts: vec![ContentPart::Text {
                text: turn.text.clone(),
            }],
        })
        .collect()
}

fn build_generation_config(params: &GenerationParams) -> GenerationConfig {
    GenerationConfig {
        temperature: params.temperature,
        top_p: params.top_p,
        top_k: params.top_k,
        max_output_tokens: params.max_tokens,
        response_modalities: if params.response_modalities.is_empty() {
            None
        } else {
            Some(params.response_modalities.clone())
        },
    }
}

/// Gemini chat provider.
pub struct GeminiChatProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiChatProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiChatProvider {
    async fn complete(
        &self,
        turns: &[RemoteTurn],
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("Gemini API key not configured".to_string())
        })?;

        let request = GenerateContentRequest {
            contents: turns_to_contents(turns),
            generation_config: Some(build_generation_config(params)),
        };

        let url = api_url(&self.config, api_key, "generateContent");

        tracing::debug!(
            model = %self.config.model,
            turn_count = turns.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        // Extract text from the first candidate
        api_response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| {
                content.parts.iter().find_map(|p| match p {
                    ContentPart::Text { text } => Some(text.clone()),
                    _ => None,
                })
            })
            .ok_or_else(|| {
                ProviderError::ApiError("Gemini API returned no text candidate".to_string())
            })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("Gemini API key not configured".to_string())
        })?;

        // Try to list models to verify the API key works
        let url = format!("{}/models?key={}", GEMINI_API_BASE, api_key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

/// Gemini image provider, consuming the streamed generation endpoint.
pub struct GeminiImageProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiImageProvider {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ImageStream, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("Gemini API key not configured".to_string())
        })?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![ContentPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(build_generation_config(params)),
        };

        let url = api_url(&self.config, api_key, "streamGenerateContent");
        let url = format!("{}&alt=sse", url);

        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Starting streaming image request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        // Create channel for streaming
        let (tx, rx) = mpsc::channel(32);

        // Spawn task to process the SSE stream
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        let chunk_str = String::from_utf8_lossy(&chunk);
                        buffer.push_str(&chunk_str);

                        // Process complete SSE events
                        while let Some(event_end) = buffer.find("\n\n") {
                            let event = buffer[..event_end].to_string();
                            buffer = buffer[event_end + 2..].to_string();

                            let Some(data) = event.strip_prefix("data: ") else {
                                continue;
                            };
                            let Ok(response) =
                                serde_json::from_str::<GenerateContentResponse>(data)
                            else {
                                continue;
                            };

                            let parts = response
                                .candidates
                                .iter()
                                .filter_map(|c| c.content.as_ref())
                                .flat_map(|content| content.parts.iter());
                            for part in parts {
                                let item = match part {
                                    ContentPart::Text { text } if !text.is_empty() => {
                                        ImageChunk::Text(text.clone())
                                    }
                                    ContentPart::InlineData { inline_data } => {
                                        ImageChunk::Image {
                                            mime_type: inline_data.mime_type.clone(),
                                            data: inline_data.data.clone().into_bytes(),
                                        }
                                    }
                                    _ => continue,
                                };
                                if tx.send(Ok(item)).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::NetworkError(e.to_string())))
                            .await;
                        return;
                    }
                }
            }
        });

        let stream = ReceiverStream::new(rx);
        Ok(Box::pin(stream) as ImageStream)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_none() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    InlineData {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}
