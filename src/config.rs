//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default canonical (processing) language.
pub const DEFAULT_CANONICAL_LANGUAGE: &str = "en";

/// Default Anthropic model used for intent classification.
pub const DEFAULT_CLASSIFIER_MODEL: &str = "claude-3-haiku-20240307";

/// Default bound on one classification request.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(15);

/// Default bound on one Twilio API request.
pub const DEFAULT_TWILIO_TIMEOUT: Duration = Duration::from_secs(15);

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Address the webhook server binds to.
    pub bind_addr: String,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Language in which classification and reply templates operate.
    pub canonical_language: String,
    /// Run turns for the same patient one at a time.
    pub serialize_turns: bool,
    /// Timeout for a single translation request.
    pub translate_timeout: Duration,
    /// Directory for daily-rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
    pub classifier: Option<ClassifierConfig>,
    pub twilio: Option<TwilioConfig>,
}

/// Anthropic classifier settings.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: SecretString,
    pub model: String,
    /// Upper bound on one classification call.
    pub timeout: Duration,
}

/// Twilio WhatsApp credentials.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Sender number, e.g. `whatsapp:+14155238886`.
    pub from_number: String,
    /// Upper bound on one API request.
    pub timeout: Duration,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            db_path: PathBuf::from("./data/clinic-intake.db"),
            canonical_language: DEFAULT_CANONICAL_LANGUAGE.to_string(),
            serialize_turns: true,
            translate_timeout: Duration::from_secs(10),
            log_dir: None,
            classifier: None,
            twilio: None,
        }
    }
}

impl IntakeConfig {
    /// Build configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let serialize_turns = match std::env::var("INTAKE_SERIALIZE_TURNS") {
            Ok(v) => parse_bool("INTAKE_SERIALIZE_TURNS", &v)?,
            Err(_) => defaults.serialize_turns,
        };

        let translate_timeout =
            env_secs("INTAKE_TRANSLATE_TIMEOUT_SECS", defaults.translate_timeout)?;

        Ok(Self {
            bind_addr: std::env::var("INTAKE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_path: std::env::var("INTAKE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            canonical_language: std::env::var("INTAKE_CANONICAL_LANGUAGE")
                .map(|s| s.trim().to_lowercase())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.canonical_language),
            serialize_turns,
            translate_timeout,
            log_dir: log_dir_from_env(),
            classifier: ClassifierConfig::from_env()?,
            twilio: TwilioConfig::from_env()?,
        })
    }
}

impl ClassifierConfig {
    /// `None` when the key is missing or still the placeholder from `.env.example`.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") else {
            return Ok(None);
        };
        if !is_real_secret(&api_key) {
            tracing::warn!(
                "Anthropic API key is not configured; intent classification uses keyword fallback"
            );
            return Ok(None);
        }
        let model = std::env::var("INTAKE_CLASSIFIER_MODEL")
            .unwrap_or_else(|_| DEFAULT_CLASSIFIER_MODEL.to_string());
        Ok(Some(Self {
            api_key: SecretString::from(api_key),
            model,
            timeout: env_secs("INTAKE_CLASSIFIER_TIMEOUT_SECS", DEFAULT_CLASSIFIER_TIMEOUT)?,
        }))
    }
}

impl TwilioConfig {
    /// `None` unless all three Twilio variables are set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Ok(account_sid), Ok(auth_token), Ok(from_number)) = (
            std::env::var("TWILIO_ACCOUNT_SID"),
            std::env::var("TWILIO_AUTH_TOKEN"),
            std::env::var("TWILIO_WHATSAPP_NUMBER"),
        ) else {
            return Ok(None);
        };
        if !is_real_secret(&account_sid) || !is_real_secret(&auth_token) {
            tracing::error!("Twilio credentials are not fully configured");
            return Ok(None);
        }
        Ok(Some(Self {
            account_sid,
            auth_token: SecretString::from(auth_token),
            from_number,
            timeout: env_secs("TWILIO_TIMEOUT_SECS", DEFAULT_TWILIO_TIMEOUT)?,
        }))
    }
}

/// Log directory from `INTAKE_LOG_DIR`. Readable before the rest of the
/// configuration so logging can be installed first.
pub fn log_dir_from_env() -> Option<PathBuf> {
    parse_log_dir(std::env::var("INTAKE_LOG_DIR").ok())
}

fn parse_log_dir(value: Option<String>) -> Option<PathBuf> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

/// Whole seconds from `key`, or `default` when unset.
fn env_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(key) {
        Ok(v) => parse_secs(key, &v),
        Err(_) => Ok(default),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "timeout must be at least one second".to_string(),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{e}"),
        }),
    }
}

fn is_real_secret(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.contains("your_")
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IntakeConfig::default();
        assert_eq!(config.canonical_language, "en");
        assert!(config.serialize_turns);
        assert!(config.classifier.is_none());
        assert!(config.twilio.is_none());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("K", "true").unwrap());
        assert!(parse_bool("K", " ON ").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(!parse_bool("K", "no").unwrap());
    }

    #[test]
    fn parse_bool_rejects_garbage() {
        let err = parse_bool("INTAKE_SERIALIZE_TURNS", "maybe").unwrap_err();
        assert!(err.to_string().contains("INTAKE_SERIALIZE_TURNS"));
    }

    #[test]
    fn blank_log_dir_means_stderr_only() {
        assert_eq!(parse_log_dir(None), None);
        assert_eq!(parse_log_dir(Some("  ".into())), None);
        assert_eq!(
            parse_log_dir(Some(" /var/log/intake ".into())),
            Some(PathBuf::from("/var/log/intake"))
        );
    }

    #[test]
    fn timeouts_are_whole_positive_seconds() {
        assert_eq!(
            parse_secs("TWILIO_TIMEOUT_SECS", " 20 ").unwrap(),
            Duration::from_secs(20)
        );
        assert!(parse_secs("TWILIO_TIMEOUT_SECS", "0").is_err());
        let err = parse_secs("TWILIO_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("TWILIO_TIMEOUT_SECS"));
    }

    #[test]
    fn placeholder_secrets_are_not_real() {
        assert!(!is_real_secret("your_claude_api_key"));
        assert!(!is_real_secret("   "));
        assert!(is_real_secret("sk-ant-123"));
    }
}
