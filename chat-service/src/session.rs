//! Chat session state.
//!
//! One session per process: the open database handle, the transcript and the
//! selected response language. Handlers reach it through `AppState`.

use std::sync::Arc;

use common::errors::{AppError, AppResult};
use common::models::{ChatTurn, ConnectionConfig, ConnectionInfo, Language};

use crate::gateway::SqlGateway;

#[derive(Default)]
pub struct ChatSession {
    gateway: Option<Arc<dyn SqlGateway>>,
    connection: Option<ConnectionInfo>,
    transcript: Vec<ChatTurn>,
    language: Language,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the database handle. The transcript is kept.
    pub fn attach(&mut self, gateway: Arc<dyn SqlGateway>, config: &ConnectionConfig) -> ConnectionInfo {
        let info = ConnectionInfo::from(config);
        if let Some(previous) = &self.connection {
            tracing::info!(
                previous = %previous.database,
                database = %info.database,
                "Replacing database connection"
            );
        }
        self.gateway = Some(gateway);
        self.connection = Some(info.clone());
        info
    }

    pub fn gateway(&self) -> AppResult<Arc<dyn SqlGateway>> {
        self.gateway.clone().ok_or(AppError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.gateway.is_some()
    }

    pub fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.connection.as_ref()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Turns are only ever appended.
    pub fn append(&mut self, turn: ChatTurn) {
        self.transcript.push(turn);
    }

    /// Empties the transcript; the database handle and artifacts stay.
    pub fn clear_history(&mut self) {
        self.transcript.clear();
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Selects the response language by display name or code.
    pub fn select_language(&mut self, name_or_code: &str) -> AppResult<Language> {
        let language = Language::find(name_or_code).ok_or_else(|| {
            AppError::Validation(format!("unsupported language '{}'", name_or_code.trim()))
        })?;
        self.language = language;
        Ok(language)
    }
}
