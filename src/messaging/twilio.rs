//! Twilio WhatsApp transport: Programmable Messaging REST API.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::TwilioConfig;
use crate::error::ChannelError;
use crate::messaging::{DeliveryId, MessagingTransport};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

const WHATSAPP_PREFIX: &str = "whatsapp:";

#[derive(Debug, Deserialize)]
struct CreateMessageResponse {
    sid: String,
}

/// WhatsApp sender over Twilio.
pub struct TwilioWhatsApp {
    config: TwilioConfig,
    api_base: String,
    client: reqwest::Client,
}

impl TwilioWhatsApp {
    pub fn new(config: TwilioConfig) -> Result<Self, ChannelError> {
        Self::with_api_base(config, TWILIO_API_BASE)
    }

    /// Every request is bounded by `config.timeout`.
    pub fn with_api_base(
        config: TwilioConfig,
        api_base: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChannelError::Http(format!("client build: {e}")))?;
        Ok(Self {
            config,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.config.account_sid
        )
    }
}

/// Twilio wants `whatsapp:+254...`; bare numbers get the prefix.
pub(crate) fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}

#[async_trait]
impl MessagingTransport for TwilioWhatsApp {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError> {
        if body.trim().is_empty() {
            return Err(ChannelError::InvalidMessage("empty message body".into()));
        }
        let to = whatsapp_address(to);
        let from = whatsapp_address(&self.config.from_number);

        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[("From", from.as_str()), ("To", to.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "twilio".into(),
                reason: if e.is_timeout() {
                    format!("timed out after {:?}", self.config.timeout)
                } else {
                    e.to_string()
                },
            })?;

        let status = resp.status();
        if !status.is_success() {
            let err_body = resp.text().await.unwrap_or_default();
            warn!(status = ?status, to = %to, "Twilio rejected outbound message");
            return Err(ChannelError::SendFailed {
                name: "twilio".into(),
                reason: format!("HTTP {status}: {err_body}"),
            });
        }

        let created: CreateMessageResponse = resp
            .json()
            .await
            .map_err(|e| ChannelError::Http(format!("invalid Twilio response: {e}")))?;

        info!(to = %to, sid = %created.sid, "Message sent");
        Ok(created.sid)
    }
}
