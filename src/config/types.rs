use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "pluralForms.pl", "translations[1]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// 1 行 1 件の番号付きリスト
fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharingSettings {
    /// How many times one selection is attempted before a commit conflict
    /// is reported to the caller.
    pub max_commit_attempts: u32,

    /// Plural form count for languages missing from `plural_forms`.
    pub default_plural_forms: usize,

    /// Language code → plural form count (e.g., `"ja": 1`, `"pl": 3`).
    pub plural_forms: HashMap<String, usize>,
}

impl SharingSettings {
    /// Expected number of plural forms for `language`.
    #[must_use]
    pub fn plural_forms_for(&self, language: &str) -> usize {
        self.plural_forms.get(language).copied().unwrap_or(self.default_plural_forms)
    }

    /// # Errors
    /// - Zero commit attempts
    /// - Zero plural forms
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.max_commit_attempts == 0 {
            errors.push(ValidationError::new(
                "maxCommitAttempts",
                "At least one attempt is required. Example: 3",
            ));
        }

        if self.default_plural_forms == 0 {
            errors.push(ValidationError::new(
                "defaultPluralForms",
                "A language has at least one plural form. Example: 2",
            ));
        }

        let mut languages: Vec<_> = self.plural_forms.iter().collect();
        languages.sort_by(|a, b| a.0.cmp(b.0));
        for (language, count) in languages {
            if language.is_empty() {
                errors.push(ValidationError::new(
                    "pluralForms",
                    "The language code cannot be empty",
                ));
            }
            if *count == 0 {
                errors.push(ValidationError::new(
                    format!("pluralForms.{language}"),
                    "A language has at least one plural form. Example: 1 for \"ja\"",
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Default for SharingSettings {
    fn default() -> Self {
        Self { max_commit_attempts: 3, default_plural_forms: 2, plural_forms: HashMap::new() }
    }
}
