//! Conversation orchestrator. Drives one patient turn end to end.
//!
//! Flow:
//! 1. Language normalization (detect, translate to the canonical language)
//! 2. Patient resolution (create on first contact, track language drift)
//! 3. Inbound transcript entry
//! 4. Intent classification
//! 5. Reply template
//! 6. Re-localization into the patient's language
//! 7. Dispatch, then outbound transcript entry
//!
//! Capability failures (language, classifier, transport) degrade the turn
//! but never abort it. Only contract and persistence errors do.
//!
//! Repeated deliveries of the same inbound message are not deduplicated:
//! each call is its own turn with its own two transcript entries.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::directory::PatientDirectory;
use crate::error::PipelineError;
use crate::intent::IntentClassifier;
use crate::language::{LanguageService, normalize_code};
use crate::messaging::MessagingTransport;
use crate::pipeline::gate::TurnGate;
use crate::pipeline::templates;
use crate::pipeline::types::{
    DeliveryOutcome, LocalizedReply, NormalizedInbound, TurnResult, TurnStatus,
};
use crate::store::{Database, Sender};
use crate::transcript::TranscriptLog;

/// Capabilities the orchestrator is built from. Constructed once per process.
pub struct OrchestratorDeps {
    pub db: Arc<dyn Database>,
    pub language: Arc<dyn LanguageService>,
    pub classifier: Arc<IntentClassifier>,
    pub transport: Arc<dyn MessagingTransport>,
}

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Language of classification and templates.
    pub canonical_language: String,
    /// Serialize turns per patient.
    pub serialize_turns: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            canonical_language: crate::config::DEFAULT_CANONICAL_LANGUAGE.to_string(),
            serialize_turns: true,
        }
    }
}

pub struct Orchestrator {
    directory: PatientDirectory,
    transcript: TranscriptLog,
    language: Arc<dyn LanguageService>,
    classifier: Arc<IntentClassifier>,
    transport: Arc<dyn MessagingTransport>,
    canonical_language: String,
    gate: Option<TurnGate>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig, deps: OrchestratorDeps) -> Self {
        Self {
            directory: PatientDirectory::new(Arc::clone(&deps.db)),
            transcript: TranscriptLog::new(deps.db),
            language: deps.language,
            classifier: deps.classifier,
            transport: deps.transport,
            canonical_language: normalize_code(&config.canonical_language)
                .unwrap_or_else(|| crate::config::DEFAULT_CANONICAL_LANGUAGE.to_string()),
            gate: config.serialize_turns.then(TurnGate::new),
        }
    }

    pub fn directory(&self) -> &PatientDirectory {
        &self.directory
    }

    pub fn transcript(&self) -> &TranscriptLog {
        &self.transcript
    }

    /// Schedule a turn on the runtime and return immediately.
    ///
    /// The turn's errors are logged inside the task; callers only get the
    /// handle, which they may drop.
    pub fn submit(self: &Arc<Self>, inbound_text: String, external_id: String) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            match this.process_turn(&inbound_text, &external_id).await {
                Ok(result) => debug!(
                    session_id = %external_id,
                    intent = %result.intent,
                    delivered = result.delivery.is_sent(),
                    "Background turn finished"
                ),
                Err(e) => error!(session_id = %external_id, error = %e, "Turn failed"),
            }
        })
    }

    /// Run one inbound → outbound cycle.
    pub async fn process_turn(
        &self,
        inbound_text: &str,
        external_id: &str,
    ) -> Result<TurnResult, PipelineError> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(PipelineError::InvalidInput("missing patient identifier".into()));
        }
        if inbound_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("empty message body".into()));
        }

        let _permit = match &self.gate {
            Some(gate) => Some(gate.enter(external_id).await),
            None => None,
        };

        info!(session_id = external_id, "Processing inbound message");

        // Step 1: language normalization
        let inbound = self.normalize_inbound(inbound_text).await;

        // Step 2: identity
        let patient = self
            .directory
            .get_or_create(external_id, &inbound.language)
            .await?;

        // Step 3: inbound transcript entry
        self.transcript
            .append(
                patient.id,
                external_id,
                Sender::Patient,
                inbound_text,
                inbound.translated.as_deref(),
                Some(&inbound.language),
            )
            .await?;

        // Step 4: classification
        let intent = self.classifier.classify(&inbound.processing_text).await;

        // Step 5: reply in the canonical language
        let canonical_reply = templates::reply_for(intent);

        // Step 6: re-localization
        let reply = self
            .localize_reply(canonical_reply, &patient.preferred_language)
            .await;

        // Step 7: dispatch, then log what was attempted regardless of delivery
        let delivery = match self.transport.send(external_id, &reply.text).await {
            Ok(delivery_id) => DeliveryOutcome::Sent { delivery_id },
            Err(e) => {
                warn!(
                    session_id = external_id,
                    transport = self.transport.name(),
                    error = %e,
                    "Reply dispatch failed; logging attempted reply"
                );
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.transcript
            .append(
                patient.id,
                external_id,
                Sender::Coordinator,
                &reply.text,
                reply.canonical.as_deref(),
                Some(&inbound.language),
            )
            .await?;

        info!(
            session_id = external_id,
            intent = %intent,
            language = %inbound.language,
            delivered = delivery.is_sent(),
            "Turn complete"
        );

        Ok(TurnResult {
            status: TurnStatus::Processed,
            intent,
            response: reply.text,
            delivery,
        })
    }

    /// Detect and translate the inbound text. Never fails: any language
    /// error leaves the original text as the processing text, even if that
    /// means the classifier sees non-canonical input.
    async fn normalize_inbound(&self, text: &str) -> NormalizedInbound {
        let untranslated = |language: String| NormalizedInbound {
            language,
            processing_text: text.to_string(),
            translated: None,
        };

        let detected = match self.language.detect(text).await {
            Ok(raw) => match normalize_code(&raw) {
                Some(language) => language,
                None => {
                    warn!("Language detection returned an empty code, using original text");
                    return untranslated(self.canonical_language.clone());
                }
            },
            Err(e) => {
                warn!(error = %e, "Language detection failed, using original text");
                return untranslated(self.canonical_language.clone());
            }
        };

        if detected == self.canonical_language {
            return untranslated(detected);
        }

        match self
            .language
            .translate(text, &self.canonical_language, &detected)
            .await
        {
            Ok(translation) => {
                debug!(
                    source = %detected,
                    translated = %translation.text,
                    "Inbound message translated"
                );
                let changed = translation.text != text;
                NormalizedInbound {
                    language: detected,
                    processing_text: translation.text.clone(),
                    translated: changed.then_some(translation.text),
                }
            }
            Err(e) => {
                warn!(
                    language = %detected,
                    error = %e,
                    "Inbound translation failed, classifying original text"
                );
                untranslated(detected)
            }
        }
    }

    /// Translate the canonical reply into `language`, falling back to the
    /// canonical text on failure.
    async fn localize_reply(&self, canonical: String, language: &str) -> LocalizedReply {
        if language == self.canonical_language {
            return LocalizedReply {
                text: canonical,
                canonical: None,
            };
        }

        match self
            .language
            .translate(&canonical, language, &self.canonical_language)
            .await
        {
            Ok(translation) if translation.text != canonical => LocalizedReply {
                text: translation.text,
                canonical: Some(canonical),
            },
            Ok(_) => LocalizedReply {
                text: canonical,
                canonical: None,
            },
            Err(e) => {
                warn!(
                    language,
                    error = %e,
                    "Reply localization failed, sending canonical text"
                );
                LocalizedReply {
                    text: canonical,
                    canonical: None,
                }
            }
        }
    }
}
