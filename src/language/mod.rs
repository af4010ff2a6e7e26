//! Language detection and translation.
//!
//! The pipeline only sees the `LanguageService` trait; `GoogleTranslate`
//! is the production adapter.

mod google;

pub use google::GoogleTranslate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LanguageError;

/// Source language value that asks the provider to detect it.
pub const AUTO_DETECT: &str = "auto";

/// A successful translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    /// Source language as requested, or as detected when `auto` was passed.
    pub source: String,
    pub dest: String,
}

/// Language capability used by the orchestrator. Implementations hold no
/// per-call state.
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Detect the language code of `text` (e.g. `en`, `sw`).
    async fn detect(&self, text: &str) -> Result<String, LanguageError>;

    /// Translate `text` into `dest`. Pass [`AUTO_DETECT`] as `source` to
    /// let the provider work it out.
    async fn translate(
        &self,
        text: &str,
        dest: &str,
        source: &str,
    ) -> Result<Translation, LanguageError>;
}

/// Reject empty or whitespace-only input before calling a provider.
pub(crate) fn validate_text(text: &str) -> Result<&str, LanguageError> {
    if text.trim().is_empty() {
        return Err(LanguageError::InvalidInput);
    }
    Ok(text)
}

/// Lowercase and trim a language code; empty codes are rejected.
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim().to_lowercase();
    if code.is_empty() { None } else { Some(code) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_invalid() {
        assert!(matches!(validate_text(""), Err(LanguageError::InvalidInput)));
        assert!(matches!(validate_text(" \n\t"), Err(LanguageError::InvalidInput)));
        assert_eq!(validate_text("habari").unwrap(), "habari");
    }

    #[test]
    fn normalize_language_codes() {
        assert_eq!(normalize_code(" SW "), Some("sw".to_string()));
        assert_eq!(normalize_code("zh-CN"), Some("zh-cn".to_string()));
        assert_eq!(normalize_code("  "), None);
    }
}
