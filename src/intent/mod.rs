//! Intent classification.
//!
//! `IntentClassifier` is the boundary the orchestrator calls. It never
//! fails: model errors and unmapped labels collapse to [`Intent::Unclear`],
//! and without a configured model it answers from keyword heuristics.

mod keywords;
mod rig_model;

pub use keywords::keyword_intent;
pub use rig_model::{RigIntentModel, anthropic_intent_model};

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LlmError;

/// Label-shaped tokens in a model reply.
static LABEL_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z_]+").unwrap());

/// Closed set of patient intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    BookAppointment,
    RescheduleAppointment,
    CancelAppointment,
    AskQuestion,
    Greeting,
    Affirmative,
    Negative,
    Unclear,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::BookAppointment,
        Intent::RescheduleAppointment,
        Intent::CancelAppointment,
        Intent::AskQuestion,
        Intent::Greeting,
        Intent::Affirmative,
        Intent::Negative,
        Intent::Unclear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Intent::BookAppointment => "book_appointment",
            Intent::RescheduleAppointment => "reschedule_appointment",
            Intent::CancelAppointment => "cancel_appointment",
            Intent::AskQuestion => "ask_question",
            Intent::Greeting => "greeting",
            Intent::Affirmative => "affirmative",
            Intent::Negative => "negative",
            Intent::Unclear => "unclear",
        }
    }

    /// Map free-form model output onto an intent. Unknown output is `Unclear`.
    pub fn from_model_output(raw: &str) -> Intent {
        let lowered = raw.trim().to_lowercase();
        LABEL_TOKEN
            .find_iter(&lowered)
            .find_map(|m| m.as_str().parse().ok())
            .unwrap_or(Intent::Unclear)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.label() == s)
            .ok_or_else(|| format!("unknown intent: {s}"))
    }
}

/// Raw classification capability (an LLM behind an API).
#[async_trait]
pub trait IntentModel: Send + Sync {
    /// Return the model's label for `text`, unparsed.
    async fn label(&self, text: &str) -> Result<String, LlmError>;
}

/// Never-failing classifier used by the pipeline.
pub struct IntentClassifier {
    model: Option<Arc<dyn IntentModel>>,
}

impl IntentClassifier {
    /// Classifier backed by a model.
    pub fn new(model: Arc<dyn IntentModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Classifier with no model; always uses the keyword fallback.
    pub fn keyword_only() -> Self {
        Self { model: None }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn classify(&self, text: &str) -> Intent {
        let Some(model) = &self.model else {
            let intent = keyword_intent(text);
            debug!(intent = %intent, "Classified with keyword fallback");
            return intent;
        };

        match model.label(text).await {
            Ok(raw) => {
                let intent = Intent::from_model_output(&raw);
                info!(intent = %intent, raw = %raw.trim(), "Classified intent");
                intent
            }
            Err(e) => {
                warn!(error = %e, "Intent classification failed, treating as unclear");
                Intent::Unclear
            }
        }
    }
}
