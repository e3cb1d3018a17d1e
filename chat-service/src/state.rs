//! Application state for chat service.

use std::sync::Arc;
use std::time::Duration;

use common::config::{AppConfig, ServiceUrls};
use tokio::sync::Mutex;

use crate::artifacts::ArtifactStore;
use crate::gateway::{Connector, SqlConnector};
use crate::llm::OllamaClient;
use crate::orchestrator::Orchestrator;
use crate::session::ChatSession;
use crate::speech::GoogleTts;
use crate::translation::MyMemoryTranslator;

/// Application state shared across handlers.
///
/// The session mutex is held for a whole question, so questions are answered
/// one at a time.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub session: Arc<Mutex<ChatSession>>,
    pub orchestrator: Arc<Orchestrator>,
    pub connector: Arc<dyn Connector>,
}

impl AppState {
    /// Creates a new application state wired to the real services.
    pub fn new(config: AppConfig, urls: ServiceUrls) -> Self {
        let http_client = reqwest::Client::new();
        let orchestrator = Orchestrator::new(
            Arc::new(OllamaClient::new(urls.llm, config.llm_model.clone(), http_client.clone())),
            Arc::new(MyMemoryTranslator::new(
                urls.translation,
                urls.translation_email,
                http_client.clone(),
            )),
            Arc::new(GoogleTts::new(urls.speech, http_client)),
            ArtifactStore::new(config.output_dir.clone()),
        );
        let connector = SqlConnector::new(
            Duration::from_secs(config.connect_timeout_secs),
            config.schema_sample_rows,
        );
        Self::with_parts(config, orchestrator, Arc::new(connector))
    }

    /// Creates a state from prebuilt parts.
    pub fn with_parts(config: AppConfig, orchestrator: Orchestrator, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            session: Arc::new(Mutex::new(ChatSession::new())),
            orchestrator: Arc::new(orchestrator),
            connector,
        }
    }
}
