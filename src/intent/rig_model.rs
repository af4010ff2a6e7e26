//! Anthropic-backed intent model via rig-core.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use secrecy::ExposeSecret;

use crate::config::ClassifierConfig;
use crate::error::LlmError;
use crate::intent::IntentModel;

/// Labels fit in a handful of tokens.
const CLASSIFY_MAX_TOKENS: u64 = 16;

const CLASSIFY_PREAMBLE: &str = r#"You triage WhatsApp messages sent by patients to a clinic in Kenya.
The clinic works in English; patients may also write in Swahili or other local languages.

Reply with exactly one of these labels and nothing else:
- book_appointment: wants to schedule a new appointment
- reschedule_appointment: wants to move an existing appointment
- cancel_appointment: wants to cancel an appointment
- ask_question: a health question or a question about the clinic (e.g. opening hours)
- greeting: a plain greeting such as "hello", "hi", "habari"
- affirmative: a yes, such as "yes", "sawa", "ndio"
- negative: a no, such as "no", "hapana"
- unclear: none of the above"#;

/// Intent model that prompts a rig `Agent`.
pub struct RigIntentModel<M: CompletionModel> {
    agent: Agent<M>,
    provider: &'static str,
    timeout: Duration,
}

impl<M: CompletionModel> RigIntentModel<M> {
    /// Each `label` call is abandoned after `timeout`.
    pub fn from_agent(agent: Agent<M>, provider: &'static str, timeout: Duration) -> Self {
        Self {
            agent,
            provider,
            timeout,
        }
    }
}

/// Run a provider call, failing with `RequestFailed` once `timeout` elapses.
async fn bounded<T, E, F>(provider: &str, timeout: Duration, call: F) -> Result<T, LlmError>
where
    F: IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: format!("timed out after {timeout:?}"),
        }),
    }
}

/// Build an Anthropic-backed intent model from configuration.
pub fn anthropic_intent_model(config: &ClassifierConfig) -> Result<Arc<dyn IntentModel>, LlmError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let agent = client
        .agent(config.model.as_str())
        .preamble(CLASSIFY_PREAMBLE)
        .temperature(0.0)
        .max_tokens(CLASSIFY_MAX_TOKENS)
        .build();

    tracing::info!("Using Anthropic intent classifier (model: {})", config.model);
    Ok(Arc::new(RigIntentModel::from_agent(
        agent,
        "anthropic",
        config.timeout,
    )))
}

#[async_trait]
impl<M> IntentModel for RigIntentModel<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn label(&self, text: &str) -> Result<String, LlmError> {
        let prompt = format!("Message: \"{text}\"\nIntent:");
        let reply = bounded(self.provider, self.timeout, self.agent.prompt(prompt)).await?;
        if reply.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider.to_string(),
                reason: "empty completion".to_string(),
            });
        }
        Ok(reply)
    }
}
