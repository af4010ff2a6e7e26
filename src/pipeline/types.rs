//! Shared types for the conversation pipeline.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::messaging::DeliveryId;

/// Outcome marker of a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Processed,
}

/// What happened when the reply was handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent { delivery_id: DeliveryId },
    Failed { reason: String },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }
}

/// Result of one inbound → outbound cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub status: TurnStatus,
    pub intent: Intent,
    /// Reply text as sent, in the patient's language for this turn.
    pub response: String,
    pub delivery: DeliveryOutcome,
}

/// Inbound text after language normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NormalizedInbound {
    /// Detected language, or the canonical language when detection failed.
    pub language: String,
    /// Text handed to the classifier.
    pub processing_text: String,
    /// `Some` only when a translation produced text different from the original.
    pub translated: Option<String>,
}

/// Outbound reply after re-localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocalizedReply {
    /// Text sent to the patient.
    pub text: String,
    /// Canonical-language text, present only when localization changed it.
    pub canonical: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_result_serializes_with_labels() {
        let result = TurnResult {
            status: TurnStatus::Processed,
            intent: Intent::Greeting,
            response: "Hello!".into(),
            delivery: DeliveryOutcome::Sent {
                delivery_id: "SM1".into(),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "processed");
        assert_eq!(json["intent"], "greeting");
        assert_eq!(json["delivery"]["outcome"], "sent");
        assert_eq!(json["delivery"]["delivery_id"], "SM1");
    }
}
