//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use common::errors::{AppError, AppResult};
use common::models::{ConnectionConfig, Language, QueryOutcome, QueryResult};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::gateway::{Connector, SqlGateway};
use crate::llm::LanguageModel;
use crate::speech::SpeechSynthesizer;
use crate::translation::Translator;

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub const ALBUM_SCHEMA: &str = "CREATE TABLE album (\n\talbum_id INT NOT NULL, \n\ttitle VARCHAR(160) NOT NULL\n)";

/// Gateway with a fixed schema and a fixed outcome for every statement.
pub struct MockGateway {
    schema: String,
    outcome: QueryOutcome,
    executed: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn returning(rows: Vec<Vec<Value>>) -> Self {
        Self::with_outcome(QueryOutcome::Rows(QueryResult::from_rows(vec![], rows, 1)))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_outcome(QueryOutcome::Failed(message.to_string()))
    }

    fn with_outcome(outcome: QueryOutcome) -> Self {
        Self {
            schema: ALBUM_SCHEMA.to_string(),
            outcome,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::returning(vec![])
    }
}

#[async_trait]
impl SqlGateway for MockGateway {
    async fn schema(&self) -> AppResult<String> {
        Ok(self.schema.clone())
    }

    async fn execute(&self, sql: &str) -> QueryOutcome {
        self.executed.lock().unwrap().push(sql.to_string());
        self.outcome.clone()
    }
}

/// Model that replays scripted completions in order and records prompts.
#[derive(Default)]
pub struct MockLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Appends a failing completion after the scripted ones.
    pub fn then_fail(self, message: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockLlm {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(AppError::ExternalService(message)),
            None => Err(AppError::ExternalService("no scripted reply".to_string())),
        }
    }
}

/// Translator that prefixes the text with the target code.
#[derive(Default)]
pub struct MockTranslator {
    fail: bool,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, target: &Language) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::ExternalService("translation quota exceeded".to_string()));
        }
        Ok(format!("[{}] {}", target.code, text))
    }
}

/// Synthesizer whose "audio" spells out its inputs.
#[derive(Default)]
pub struct MockSpeech {
    fail: bool,
    languages: Mutex<Vec<String>>,
}

impl MockSpeech {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSpeech {
    async fn synthesize(&self, text: &str, language_code: &str) -> AppResult<Vec<u8>> {
        self.languages.lock().unwrap().push(language_code.to_string());
        if self.fail {
            return Err(AppError::ExternalService("speech service returned 503".to_string()));
        }
        Ok(format!("mp3:{}:{}", language_code, text).into_bytes())
    }
}

/// Connector that hands out a shared gateway, or refuses every connection.
pub struct MockConnector {
    gateway: Option<Arc<MockGateway>>,
}

impl MockConnector {
    pub fn accepting(gateway: Arc<MockGateway>) -> Self {
        Self {
            gateway: Some(gateway),
        }
    }

    pub fn refusing() -> Self {
        Self { gateway: None }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &ConnectionConfig) -> AppResult<Arc<dyn SqlGateway>> {
        match &self.gateway {
            Some(gateway) => Ok(gateway.clone() as Arc<dyn SqlGateway>),
            None => Err(AppError::DatabaseConnection(format!(
                "Access denied for user '{}'@'{}'",
                config.username, config.host
            ))),
        }
    }
}
