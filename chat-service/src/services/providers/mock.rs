//! Mock provider implementations for testing.

use super::{
    ChatProvider, GenerationParams, ImageChunk, ImageProvider, ImageStream, ProviderError,
};
use crate::models::RemoteTurn;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Mock chat provider that records every completion call.
pub struct MockChatProvider {
    enabled: bool,
    calls: Arc<Mutex<Vec<Vec<RemoteTurn>>>>,
}

impl MockChatProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the conversations sent so far, in call order.
    pub fn calls(&self) -> Vec<Vec<RemoteTurn>> {
        self.calls.lock().expect("mock call log poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock call log poisoned").len()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(
        &self,
        turns: &[RemoteTurn],
        _params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock chat provider not enabled".to_string(),
            ));
        }

        self.calls
            .lock()
            .expect("mock call log poisoned")
            .push(turns.to_vec());

        let last = turns
            .last()
            .map(|turn| turn.text.as_str())
            .unwrap_or_default();
        Ok(format!("Mock response for: {}", last))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock chat provider not enabled".to_string(),
            ))
        }
    }
}

/// Mock image provider replaying a scripted chunk sequence.
pub struct MockImageProvider {
    enabled: bool,
    script: Vec<ImageChunk>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockImageProvider {
    pub fn new(enabled: bool, script: Vec<ImageChunk>) -> Self {
        Self {
            enabled,
            script,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("mock prompt log poisoned").clone()
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate_stream(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<ImageStream, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock image provider not enabled".to_string(),
            ));
        }

        self.prompts
            .lock()
            .expect("mock prompt log poisoned")
            .push(prompt.to_string());

        let chunks: Vec<Result<ImageChunk, ProviderError>> =
            self.script.iter().cloned().map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock image provider not enabled".to_string(),
            ))
        }
    }
}
