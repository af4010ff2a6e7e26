//! Transcript log: append-only record of every inbound and outbound message.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::{Database, Message, NewMessage, Sender};

/// Append-only transcript. Entries are never updated or deleted here.
pub struct TranscriptLog {
    db: Arc<dyn Database>,
}

impl TranscriptLog {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Append one entry. Ordering is the caller's call order.
    pub async fn append(
        &self,
        patient_id: Uuid,
        session_id: &str,
        sender: Sender,
        content: &str,
        translated_content: Option<&str>,
        language: Option<&str>,
    ) -> Result<Message, DatabaseError> {
        self.db
            .append_message(NewMessage {
                patient_id,
                session_id,
                sender,
                content,
                translated_content,
                language,
            })
            .await
    }

    /// All entries of a session, oldest first.
    pub async fn session(&self, session_id: &str) -> Result<Vec<Message>, DatabaseError> {
        self.db.list_session_messages(session_id).await
    }
}
