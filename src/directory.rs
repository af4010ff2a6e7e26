//! Patient directory: phone number to patient, created on first contact.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::{Database, Patient};

/// Resolves patients by their external identifier (phone number).
///
/// Uniqueness is enforced by the database: creation is an
/// insert-if-absent followed by a re-fetch, so two turns racing on the
/// same phone number both end up with the same row.
pub struct PatientDirectory {
    db: Arc<dyn Database>,
}

impl PatientDirectory {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Look up a patient without creating one.
    pub async fn get(&self, phone_number: &str) -> Result<Option<Patient>, DatabaseError> {
        self.db.get_patient_by_phone(phone_number).await
    }

    /// Fetch the patient for `phone_number`, creating it with `language`
    /// if absent. An existing patient whose stored language differs from
    /// `language` is updated to it.
    pub async fn get_or_create(
        &self,
        phone_number: &str,
        language: &str,
    ) -> Result<Patient, DatabaseError> {
        if let Some(mut patient) = self.db.get_patient_by_phone(phone_number).await? {
            if patient.preferred_language != language {
                debug!(
                    patient_id = %patient.id,
                    from = %patient.preferred_language,
                    to = language,
                    "Patient language changed"
                );
                self.db.update_patient_language(patient.id, language).await?;
                patient.preferred_language = language.to_string();
            }
            return Ok(patient);
        }

        if self.db.insert_patient_if_absent(phone_number, language).await? {
            info!(phone_number, language, "Created new patient");
            return self.fetch_existing(phone_number).await;
        }

        // Lost the race to a concurrent turn: take its row, then apply our language.
        debug!(phone_number, "Patient created concurrently, re-fetching");
        let mut patient = self.fetch_existing(phone_number).await?;
        if patient.preferred_language != language {
            self.db.update_patient_language(patient.id, language).await?;
            patient.preferred_language = language.to_string();
        }
        Ok(patient)
    }

    async fn fetch_existing(&self, phone_number: &str) -> Result<Patient, DatabaseError> {
        self.db
            .get_patient_by_phone(phone_number)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "patient".into(),
                id: phone_number.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::store::{LibSqlBackend, Message, NewMessage};

    /// Wraps a real backend but hides the patient from the first lookup,
    /// as if another turn inserted it between our read and our insert.
    struct LateInsertDb {
        inner: LibSqlBackend,
        hide_next_lookup: AtomicBool,
        inserts_refused: AtomicUsize,
    }

    #[async_trait]
    impl Database for LateInsertDb {
        async fn init_schema(&self) -> Result<(), DatabaseError> {
            self.inner.init_schema().await
        }
        async fn insert_patient_if_absent(
            &self,
            phone_number: &str,
            language: &str,
        ) -> Result<bool, DatabaseError> {
            let inserted = self.inner.insert_patient_if_absent(phone_number, language).await?;
            if !inserted {
                self.inserts_refused.fetch_add(1, Ordering::SeqCst);
            }
            Ok(inserted)
        }
        async fn get_patient_by_phone(
            &self,
            phone_number: &str,
        ) -> Result<Option<Patient>, DatabaseError> {
            if self.hide_next_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.get_patient_by_phone(phone_number).await
        }
        async fn update_patient_language(
            &self,
            id: Uuid,
            language: &str,
        ) -> Result<(), DatabaseError> {
            self.inner.update_patient_language(id, language).await
        }
        async fn append_message(&self, message: NewMessage<'_>) -> Result<Message, DatabaseError> {
            self.inner.append_message(message).await
        }
        async fn list_session_messages(
            &self,
            session_id: &str,
        ) -> Result<Vec<Message>, DatabaseError> {
            self.inner.list_session_messages(session_id).await
        }
    }

    async fn directory() -> PatientDirectory {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        PatientDirectory::new(db)
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let dir = directory().await;
        let first = dir.get_or_create("+100", "en").await.unwrap();
        let second = dir.get_or_create("+100", "en").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.phone_number, "+100");
    }

    #[tokio::test]
    async fn language_drifts_with_latest_turn() {
        let dir = directory().await;
        let first = dir.get_or_create("+100", "en").await.unwrap();
        assert_eq!(first.preferred_language, "en");

        let second = dir.get_or_create("+100", "sw").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.preferred_language, "sw");

        let stored = dir.get("+100").await.unwrap().unwrap();
        assert_eq!(stored.preferred_language, "sw");
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let dir = directory().await;
        assert!(dir.get("+404").await.unwrap().is_none());
        assert!(dir.get("+404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lost_creation_race_adopts_existing_patient() {
        let db = Arc::new(LateInsertDb {
            inner: LibSqlBackend::new_memory().await.unwrap(),
            hide_next_lookup: AtomicBool::new(false),
            inserts_refused: AtomicUsize::new(0),
        });
        let dir = PatientDirectory::new(Arc::clone(&db) as Arc<dyn Database>);
        let existing = dir.get_or_create("+254700000009", "en").await.unwrap();

        db.hide_next_lookup.store(true, Ordering::SeqCst);
        let patient = dir.get_or_create("+254700000009", "sw").await.unwrap();

        assert_eq!(db.inserts_refused.load(Ordering::SeqCst), 1);
        assert_eq!(patient.id, existing.id);
        assert_eq!(patient.preferred_language, "sw");
        let stored = dir.get("+254700000009").await.unwrap().unwrap();
        assert_eq!(stored.id, existing.id);
        assert_eq!(stored.preferred_language, "sw");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_contact_creates_one_patient() {
        let dir = Arc::new(directory().await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let dir = Arc::clone(&dir);
            handles.push(tokio::spawn(async move {
                dir.get_or_create("+254712345678", "sw").await.unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
    }
}
