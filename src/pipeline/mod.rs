//! Conversation pipeline.
//!
//! Every inbound WhatsApp message becomes one turn:
//! 1. Language normalization into the canonical language
//! 2. Patient resolution and the inbound transcript entry
//! 3. Intent classification and the reply template
//! 4. Re-localization, dispatch, and the outbound transcript entry
//!
//! Turns for the same patient are serialized by [`TurnGate`].

pub mod gate;
pub mod orchestrator;
pub mod templates;
pub mod types;

pub use gate::{TurnGate, TurnPermit};
pub use orchestrator::{Orchestrator, OrchestratorConfig, OrchestratorDeps};
pub use templates::reply_for;
pub use types::{DeliveryOutcome, TurnResult, TurnStatus};
