//! Google Translate adapter over the public `translate_a/single` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LanguageError;
use crate::language::{AUTO_DETECT, LanguageService, Translation, normalize_code, validate_text};

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

/// Google Translate client. One instance per process, shared by reference.
pub struct GoogleTranslate {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GoogleTranslate {
    pub fn new(timeout: Duration) -> Result<Self, LanguageError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Point the adapter at another host (used for proxies and tests).
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LanguageError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LanguageError::RequestFailed(format!("client build: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn call(&self, text: &str, source: &str, dest: &str) -> Result<Value, LanguageError> {
        let resp = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", dest),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LanguageError::Timeout(self.timeout)
                } else {
                    LanguageError::RequestFailed(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, "Translation request rejected");
            return Err(LanguageError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| LanguageError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LanguageService for GoogleTranslate {
    async fn detect(&self, text: &str) -> Result<String, LanguageError> {
        let text = validate_text(text).map_err(|_| {
            LanguageError::DetectionFailed("cannot detect the language of empty text".into())
        })?;
        let body = self.call(text, AUTO_DETECT, "en").await?;
        let detected = parse_detected_language(&body)
            .ok_or_else(|| LanguageError::DetectionFailed("no source language in response".into()))?;
        debug!(language = %detected, "Detected language");
        Ok(detected)
    }

    async fn translate(
        &self,
        text: &str,
        dest: &str,
        source: &str,
    ) -> Result<Translation, LanguageError> {
        let text = validate_text(text)?;
        let body = self.call(text, source, dest).await?;
        let translated = parse_translated_text(&body)?;

        let source = if source == AUTO_DETECT {
            parse_detected_language(&body).unwrap_or_else(|| AUTO_DETECT.to_string())
        } else {
            source.to_string()
        };
        debug!(source = %source, dest, "Translated text");

        Ok(Translation {
            text: translated,
            source,
            dest: dest.to_string(),
        })
    }
}

/// Concatenate the translated segments: `body[0][i][0]`.
fn parse_translated_text(body: &Value) -> Result<String, LanguageError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| LanguageError::InvalidResponse("missing segment list".into()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(LanguageError::EmptyResult);
    }
    Ok(text)
}

/// Detected source language lives at `body[2]`.
fn parse_detected_language(body: &Value) -> Option<String> {
    body.get(2).and_then(Value::as_str).and_then(normalize_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!([
            [
                ["I want ", "Nataka ", null, null, 10],
                ["to book an appointment", "kuweka miadi", null, null, 10]
            ],
            null,
            "sw"
        ])
    }

    #[test]
    fn parses_translated_segments() {
        assert_eq!(
            parse_translated_text(&sample()).unwrap(),
            "I want to book an appointment"
        );
    }

    #[test]
    fn parses_detected_language() {
        assert_eq!(parse_detected_language(&sample()).as_deref(), Some("sw"));
        assert_eq!(parse_detected_language(&json!([[], null])), None);
    }

    #[test]
    fn empty_segments_are_an_error() {
        let body = json!([[["", "x", null]], null, "sw"]);
        assert!(matches!(
            parse_translated_text(&body),
            Err(LanguageError::EmptyResult)
        ));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            parse_translated_text(&json!({"error": "nope"})),
            Err(LanguageError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn translate_rejects_empty_input_without_network() {
        let svc = GoogleTranslate::with_base_url("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let err = svc.translate("   ", "en", AUTO_DETECT).await.unwrap_err();
        assert!(matches!(err, LanguageError::InvalidInput));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error_result() {
        let svc = GoogleTranslate::with_base_url("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        assert!(svc.detect("habari").await.is_err());
        assert!(svc.translate("habari", "en", AUTO_DETECT).await.is_err());
    }
}
