use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;

/// Default chat model.
const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-pro";

/// Default image-generation model.
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Default MongoDB database name.
const DEFAULT_DATABASE: &str = "chat_db";

/// Default directory for generated image files.
const DEFAULT_IMAGE_DIR: &str = "generated_images";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub mongodb: MongoSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSettings {
    /// Absent key disables chat and image generation but not the service.
    pub api_key: Option<String>,
    pub chat_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoSettings {
    /// Absent URI disables transcript persistence but not chat.
    pub uri: Option<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub image_dir: String,
}

impl ChatConfig {
    /// Settings resolve in deployment order: process environment, then the
    /// `app.yaml` descriptor, then the local `.env` file.
    pub fn load() -> Result<Self, AppError> {
        let descriptor = core_config::deployment_env_vars();
        let resolve = |key: &str| core_config::resolve_var(key, &descriptor);

        Ok(ChatConfig {
            common: core_config::Config::load()?,
            gemini: GeminiSettings {
                api_key: resolve("GEMINI_API_KEY"),
                chat_model: resolve("GEMINI_CHAT_MODEL")
                    .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
                image_model: resolve("GEMINI_IMAGE_MODEL")
                    .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            },
            mongodb: MongoSettings {
                uri: resolve("MONGODB_URI"),
                database: resolve("MONGODB_DATABASE")
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            },
            storage: StorageSettings {
                image_dir: resolve("GENERATED_IMAGE_DIR")
                    .unwrap_or_else(|| DEFAULT_IMAGE_DIR.to_string()),
            },
        })
    }
}
