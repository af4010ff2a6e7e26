//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;

/// A patient, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub phone_number: String,
    pub preferred_language: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who wrote a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Inbound from the patient.
    Patient,
    /// Outbound from the intake coordinator.
    Coordinator,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Patient => "patient",
            Sender::Coordinator => "coordinator",
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Sender::Patient),
            "coordinator" => Ok(Sender::Coordinator),
            other => Err(format!("unknown sender: {other}")),
        }
    }
}

/// A transcript entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub patient_id: Option<Uuid>,
    pub session_id: String,
    pub sender: Sender,
    pub content: String,
    pub translated_content: Option<String>,
    pub language: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Fields of a transcript entry before it is persisted.
#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub patient_id: Uuid,
    pub session_id: &'a str,
    pub sender: Sender,
    pub content: &'a str,
    pub translated_content: Option<&'a str>,
    pub language: Option<&'a str>,
}

/// Backend-agnostic database trait covering patients and the transcript.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    // ── Patients ────────────────────────────────────────────────────

    /// Insert a patient unless one with this phone number exists.
    /// Returns `true` if a row was created.
    async fn insert_patient_if_absent(
        &self,
        phone_number: &str,
        language: &str,
    ) -> Result<bool, DatabaseError>;

    /// Look up a patient by phone number.
    async fn get_patient_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Patient>, DatabaseError>;

    /// Set a patient's preferred language.
    async fn update_patient_language(
        &self,
        id: Uuid,
        language: &str,
    ) -> Result<(), DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Append a transcript entry and return it as stored.
    async fn append_message(&self, message: NewMessage<'_>) -> Result<Message, DatabaseError>;

    /// All messages of a session, oldest first.
    async fn list_session_messages(&self, session_id: &str)
    -> Result<Vec<Message>, DatabaseError>;
}
