use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// The `env_variables` map of the deployment descriptor (`app.yaml`),
/// empty when the file is absent or malformed.
pub fn deployment_env_vars() -> HashMap<String, String> {
    #[derive(Deserialize)]
    struct Descriptor {
        #[serde(default)]
        env_variables: HashMap<String, String>,
    }

    Cfg::builder()
        .add_source(File::with_name("app").required(false))
        .build()
        .and_then(|cfg| cfg.try_deserialize::<Descriptor>())
        .map(|descriptor| descriptor.env_variables)
        .unwrap_or_default()
}

/// Resolve a setting with the deployment precedence: process environment
/// first, then the deployment descriptor, then the local `.env` file.
pub fn resolve_var(key: &str, descriptor: &HashMap<String, String>) -> Option<String> {
    env::var(key)
        .ok()
        .or_else(|| descriptor.get(key).cloned())
        .or_else(|| dotenv_var(key))
}

// Reads `.env` without exporting it into the process environment, so the
// precedence above holds for every key, not just the first one resolved.
fn dotenv_var(key: &str) -> Option<String> {
    let entries = dotenvy::dotenv_iter().ok()?;
    for entry in entries {
        if let Ok((name, value)) = entry {
            if name == key {
                return Some(value);
            }
        }
    }
    None
}
