//! Clinic intake: WhatsApp conversation pipeline.

pub mod config;
pub mod directory;
pub mod error;
pub mod intent;
pub mod language;
pub mod messaging;
pub mod pipeline;
pub mod store;
pub mod transcript;
pub mod webhook;
