//! Image generation: consumes the streamed model response and persists the
//! first inline image payload as a normalized PNG.

use crate::services::providers::{GenerationParams, ImageChunk, ImageProvider, ImageStream};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::ImageFormat;
use service_core::error::AppError;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_stream::StreamExt;

/// Local directory holding generated image files, one subdirectory per
/// session.
pub struct ImageStore {
    base_path: PathBuf,
}

impl ImageStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    /// Output path for the n-th image of a session.
    fn image_path(&self, session_id: &str, seq: u32) -> PathBuf {
        self.base_path
            .join(session_id)
            .join(format!("generated_image_{}.png", seq))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }
}

/// Adapter from the streamed generation call to a saved image artifact.
/// Errors never escape this boundary; every failure becomes `None` plus a
/// logged message.
pub struct ImageGenerator {
    provider: Arc<dyn ImageProvider>,
    store: ImageStore,
}

impl ImageGenerator {
    pub fn new(provider: Arc<dyn ImageProvider>, store: ImageStore) -> Self {
        Self { provider, store }
    }

    /// Generate an image for the prompt and return the saved file path, or
    /// `None` when generation failed.
    pub async fn generate(&self, session_id: &str, seq: u32, prompt: &str) -> Option<PathBuf> {
        if prompt.is_empty() {
            tracing::warn!(session_id = %session_id, "Empty image prompt rejected");
            return None;
        }

        let mut stream: ImageStream = match self
            .provider
            .generate_stream(prompt, &GenerationParams::image())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, session_id = %session_id, "Image generation request failed");
                return None;
            }
        };

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(ImageChunk::Text(text)) => {
                    // Informational, not an error; keep consuming.
                    tracing::debug!(session_id = %session_id, text = %text, "Model text during image generation");
                }
                Ok(ImageChunk::Image { mime_type, data }) => {
                    let path = self.store.image_path(session_id, seq);
                    let bytes = decode_payload(&data);

                    match self.save_png(&path, &bytes).await {
                        Ok(()) => {
                            tracing::info!(
                                session_id = %session_id,
                                path = %path.display(),
                                mime_type = %mime_type,
                                "Generated image saved"
                            );
                            return Some(path);
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                mime_type = %mime_type,
                                "PNG conversion failed, writing raw payload"
                            );
                            match self.store.write(&path, &bytes).await {
                                Ok(()) => return Some(path),
                                Err(e) => {
                                    tracing::error!(error = %e, "Failed to write image payload");
                                    return None;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, session_id = %session_id, "Image stream error");
                    return None;
                }
            }
        }

        tracing::warn!(session_id = %session_id, "Image stream ended without an image payload");
        None
    }

    /// Decode the payload into an image, normalize to RGB, and write it out
    /// as PNG.
    async fn save_png(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Image decode failed: {}", e)))?;

        let normalized = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
        let mut png = Vec::new();
        normalized
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("PNG encode failed: {}", e)))?;

        self.store.write(path, &png).await
    }
}

/// The inline payload may arrive base64-encoded or raw; try base64 first
/// and fall back to the bytes as-is.
fn decode_payload(data: &[u8]) -> Vec<u8> {
    match BASE64_STANDARD.decode(data) {
        Ok(decoded) => decoded,
        Err(_) => data.to_vec(),
    }
}
