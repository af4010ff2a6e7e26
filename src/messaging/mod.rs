//! Outbound messaging transport.

mod twilio;

pub use twilio::TwilioWhatsApp;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Provider-assigned identifier of a sent message (Twilio SID).
pub type DeliveryId = String;

/// Sends a text to a patient. Delivery retries are the provider's concern.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    async fn send(&self, to: &str, body: &str) -> Result<DeliveryId, ChannelError>;
}

/// Stand-in used when no transport credentials are configured. Every send
/// fails with `NotConfigured`; turns still complete and are logged.
pub struct DisabledTransport;

#[async_trait]
impl MessagingTransport for DisabledTransport {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn send(&self, to: &str, _body: &str) -> Result<DeliveryId, ChannelError> {
        tracing::error!(to, "Messaging transport is not configured, cannot send message");
        Err(ChannelError::NotConfigured {
            name: "whatsapp".into(),
        })
    }
}
