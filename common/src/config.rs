//! Environment-driven configuration.
//!
//! Every value has a default so the service starts without any environment
//! set up; a `.env` file is loaded by the binary before [`AppConfig::load_with_service`].

use std::path::PathBuf;
use std::str::FromStr;

/// Service-level configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name of the service using this configuration (used in logs and responses).
    pub service: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Timeout when opening the database connection.
    pub connect_timeout_secs: u64,
    /// Number of sample rows appended to each table in the schema text (0 disables).
    pub schema_sample_rows: u32,
    /// Directory holding `response.txt` and `response.mp3`.
    pub output_dir: PathBuf,
    /// Model name sent to the language model server.
    pub llm_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: "chat-service".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8083,
            connect_timeout_secs: 10,
            schema_sample_rows: 3,
            output_dir: PathBuf::from("output"),
            llm_model: "llama2".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the environment, tagging it with a service name.
    pub fn load_with_service(service: &str) -> Self {
        let defaults = Self::default();
        Self {
            service: service.to_string(),
            host: env_or("SERVER_HOST", defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            schema_sample_rows: env_or("SCHEMA_SAMPLE_ROWS", defaults.schema_sample_rows),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            llm_model: env_or("LLM_MODEL", defaults.llm_model),
        }
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Base URLs of the external services the pipeline talks to.
#[derive(Debug, Clone)]
pub struct ServiceUrls {
    /// Ollama-compatible language model server.
    pub llm: String,
    /// MyMemory-compatible translation endpoint.
    pub translation: String,
    /// Contact email sent to the translation API for a higher daily quota.
    pub translation_email: Option<String>,
    /// Google-Translate-compatible text-to-speech endpoint.
    pub speech: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            llm: "http://localhost:11434".to_string(),
            translation: "https://api.mymemory.translated.net/get".to_string(),
            translation_email: None,
            speech: "https://translate.google.com/translate_tts".to_string(),
        }
    }
}

impl ServiceUrls {
    /// Loads service URLs from the environment.
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            llm: env_or("LLM_BASE_URL", defaults.llm),
            translation: env_or("TRANSLATION_API_URL", defaults.translation),
            translation_email: std::env::var("TRANSLATION_EMAIL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            speech: env_or("TTS_API_URL", defaults.speech),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Ignoring unparsable environment value");
                default
            }
        },
        Err(_) => default,
    }
}
