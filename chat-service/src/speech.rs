//! Speech synthesis.
//!
//! Uses the public Google Translate text-to-speech endpoint. The endpoint
//! only accepts short texts, so answers are sent in pieces and the returned
//! MP3 frames are concatenated.

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use common::models::language::Language;

use crate::chunking::split_text;

/// Longest text the endpoint speaks in one request.
const MAX_REQUEST_CHARS: usize = 100;

/// Text → MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language_code: &str) -> AppResult<Vec<u8>>;
}

/// Google Translate TTS [`SpeechSynthesizer`].
pub struct GoogleTts {
    api_url: String,
    http_client: reqwest::Client,
}

impl GoogleTts {
    pub fn new(api_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            api_url: api_url.into(),
            http_client,
        }
    }

    async fn fetch_piece(
        &self,
        piece: &str,
        language_code: &str,
        idx: usize,
        total: usize,
    ) -> AppResult<Vec<u8>> {
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = piece.chars().count().to_string();
        let query = [
            ("ie", "UTF-8"),
            ("q", piece),
            ("tl", language_code),
            ("client", "tw-ob"),
            ("total", total.as_str()),
            ("idx", idx.as_str()),
            ("textlen", textlen.as_str()),
        ];

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("speech service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "speech service returned {} for language '{}'",
                status, language_code
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            AppError::ExternalService(format!("speech service response interrupted: {}", e))
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, language_code: &str) -> AppResult<Vec<u8>> {
        if Language::from_code(language_code).is_none() {
            return Err(AppError::ExternalService(format!(
                "unsupported language code '{}'",
                language_code
            )));
        }

        let pieces = split_text(text, MAX_REQUEST_CHARS);
        if pieces.is_empty() {
            return Err(AppError::ExternalService("no text to speak".to_string()));
        }

        let mut audio = Vec::new();
        for (idx, piece) in pieces.iter().enumerate() {
            let bytes = self.fetch_piece(piece, language_code, idx, pieces.len()).await?;
            audio.extend_from_slice(&bytes);
        }

        tracing::debug!(
            language = language_code,
            pieces = pieces.len(),
            bytes = audio.len(),
            "Speech synthesized"
        );
        Ok(audio)
    }
}
