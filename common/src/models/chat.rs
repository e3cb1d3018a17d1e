//! Chat transcript models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::language::Language;
use crate::errors::{AppError, AppResult};

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The person asking questions.
    User,
    /// The generated answer.
    Assistant,
}

/// One message of the transcript. Immutable once appended.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatTurn {
    /// Who wrote the message.
    pub role: ChatRole,
    /// Message text (markdown).
    pub content: String,
    /// When the turn was appended.
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    /// Creates a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Creates an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Request body for asking a question.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AskRequest {
    /// Natural-language question about the connected database.
    #[validate(length(min = 1, max = 4000, message = "Question must be 1-4000 characters"))]
    pub question: String,
}

impl AskRequest {
    /// Validates the request and returns the trimmed question. A question of
    /// only whitespace is rejected.
    pub fn question(&self) -> AppResult<&str> {
        self.validate()?;
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question must not be blank".to_string()));
        }
        Ok(question)
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AskResponse {
    /// The question as asked.
    pub question: String,
    /// SQL generated by the model, exactly as executed.
    pub query: String,
    /// Query result as passed to the model (rows or error text).
    pub result: String,
    /// Final answer, translated when a non-English language is selected.
    pub answer: String,
    /// Language of the answer and the audio artifact.
    pub language: Language,
}
