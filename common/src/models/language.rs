//! Response languages.
//!
//! The same table drives translation and speech synthesis.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Code of the language answers are generated in.
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// A supported response language.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, ToSchema)]
pub struct Language {
    /// Display name, e.g. "Hindi".
    pub name: &'static str,
    /// Two-letter code, e.g. "hi".
    pub code: &'static str,
}

/// Display name → code table.
pub const SUPPORTED_LANGUAGES: [Language; 16] = [
    Language { name: "English", code: "en" },
    Language { name: "Hindi", code: "hi" },
    Language { name: "Bengali", code: "bn" },
    Language { name: "Telugu", code: "te" },
    Language { name: "Tamil", code: "ta" },
    Language { name: "Gujarati", code: "gu" },
    Language { name: "Kannada", code: "kn" },
    Language { name: "Punjabi", code: "pa" },
    Language { name: "Malayalam", code: "ml" },
    Language { name: "Spanish", code: "es" },
    Language { name: "French", code: "fr" },
    Language { name: "German", code: "de" },
    Language { name: "Italian", code: "it" },
    Language { name: "Portuguese", code: "pt" },
    Language { name: "Arabic", code: "ar" },
    Language { name: "Russian", code: "ru" },
];

impl Language {
    /// English, the language the model answers in.
    pub fn english() -> Self {
        SUPPORTED_LANGUAGES[0]
    }

    /// Looks a language up by display name or code, ignoring case.
    pub fn find(query: &str) -> Option<Self> {
        let query = query.trim();
        SUPPORTED_LANGUAGES
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(query) || l.code.eq_ignore_ascii_case(query))
            .copied()
    }

    /// Looks a language up by its code only.
    pub fn from_code(code: &str) -> Option<Self> {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|l| l.code.eq_ignore_ascii_case(code.trim()))
            .copied()
    }

    /// Whether answers in this language need translating.
    pub fn needs_translation(&self) -> bool {
        self.code != DEFAULT_LANGUAGE_CODE
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::english()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Request body for selecting the response language.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SelectLanguageRequest {
    /// Display name or code.
    #[validate(length(min = 1, message = "Language is required"))]
    pub language: String,
}

/// Language table together with the current selection.
#[derive(Debug, Serialize, ToSchema)]
pub struct LanguagesResponse {
    /// Currently selected language.
    pub selected: Language,
    /// All supported languages.
    pub supported: Vec<Language>,
}
