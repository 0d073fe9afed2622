use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::services::database::Database;

pub const APP_NAME: &str = "chatlog";
pub const APP_DIR_NAME: &str = "chatlog";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "o4-mini";

/// Settings for the completion request, handed to the controller at construction.
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .finish()
    }
}

/// Resolved process configuration.
#[derive(Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub endpoint: Url,
    pub model: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field("endpoint", &self.endpoint.as_str())
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Config {
    pub fn new(
        db_path: Option<PathBuf>,
        endpoint: &str,
        model: String,
        api_key: Option<String>,
    ) -> Result<Self> {
        let db_path = match db_path {
            Some(path) => path,
            None => Database::default_path()?,
        };

        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid completion endpoint: {}", endpoint))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("Completion endpoint must be http or https: {}", endpoint);
        }

        if model.trim().is_empty() {
            bail!("Model name must not be empty");
        }

        Ok(Self {
            db_path,
            endpoint,
            model,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Completion settings; fails when no API key was supplied.
    pub fn completion(&self) -> Result<CompletionConfig> {
        let Some(api_key) = self.api_key.clone() else {
            bail!("No API key configured; set OPENAI_API_KEY or pass --api-key");
        };
        Ok(CompletionConfig {
            api_key,
            model: self.model.clone(),
        })
    }
}
