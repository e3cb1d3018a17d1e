//! Translation client.
//!
//! Translates English answers through the MyMemory API. Stateless: each call
//! is keyed only by the target language code.

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use common::models::language::{Language, DEFAULT_LANGUAGE_CODE};
use serde::Deserialize;

use crate::chunking::split_text;

/// Longest text MyMemory translates in one request.
const MAX_REQUEST_CHARS: usize = 500;

/// English → target language translation.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &Language) -> AppResult<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryResponse {
    response_data: MyMemoryData,
    /// Numeric on success, sometimes a string on errors.
    response_status: serde_json::Value,
    #[serde(default)]
    response_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyMemoryData {
    translated_text: String,
}

/// MyMemory-backed [`Translator`].
pub struct MyMemoryTranslator {
    api_url: String,
    email: Option<String>,
    http_client: reqwest::Client,
}

impl MyMemoryTranslator {
    pub fn new(api_url: impl Into<String>, email: Option<String>, http_client: reqwest::Client) -> Self {
        Self {
            api_url: api_url.into(),
            email,
            http_client,
        }
    }

    async fn translate_piece(&self, piece: &str, target: &Language) -> AppResult<String> {
        let langpair = format!("{}|{}", DEFAULT_LANGUAGE_CODE, target.code);
        let mut query: Vec<(&str, &str)> = vec![("q", piece), ("langpair", &langpair)];
        if let Some(email) = &self.email {
            query.push(("de", email));
        }

        let response = self
            .http_client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("translation service unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::ExternalService(format!(
                "translation service returned {}",
                status
            )));
        }

        let body: MyMemoryResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("translation service returned an invalid response: {}", e))
        })?;

        let api_status = match &body.response_status {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        };
        if api_status != Some(200) {
            return Err(AppError::ExternalService(format!(
                "translation failed ({}): {}",
                body.response_status,
                body.response_details
                    .unwrap_or(body.response_data.translated_text)
            )));
        }

        Ok(unescape_html(&body.response_data.translated_text))
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, target: &Language) -> AppResult<String> {
        if Language::from_code(target.code).is_none() {
            return Err(AppError::ExternalService(format!(
                "unsupported language code '{}'",
                target.code
            )));
        }

        let pieces = split_text(text, MAX_REQUEST_CHARS);
        let mut translated = Vec::with_capacity(pieces.len());
        for piece in &pieces {
            translated.push(self.translate_piece(piece, target).await?);
        }

        tracing::debug!(language = target.code, pieces = pieces.len(), "Answer translated");
        Ok(translated.join(" "))
    }
}

/// Decodes the HTML entities MyMemory leaves in its output: the common named
/// ones plus decimal (`&#39;`) and hexadecimal (`&#x27;`) references. Anything
/// else is kept as written.
fn unescape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|&end| end <= 10).and_then(|end| {
            decode_entity(&candidate[1..end]).map(|c| (c, end))
        }) {
            Some((c, end)) => {
                out.push(c);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        };
    };
    char::from_u32(code)
}
