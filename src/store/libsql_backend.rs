//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Database, Message, NewMessage, Patient, Sender};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("invalid uuid '{s}': {e}")))
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Map a libsql Row to a Patient.
///
/// Column order matches PATIENT_COLUMNS.
fn row_to_patient(row: &libsql::Row) -> Result<Patient, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let phone_number: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let language: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let created_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;

    Ok(Patient {
        id: parse_uuid(&id_str)?,
        phone_number,
        preferred_language: language,
        display_name: row.get(2).ok(),
        created_at: parse_datetime(&created_str),
    })
}

/// Map a libsql Row to a Message.
///
/// Column order matches MESSAGE_COLUMNS.
fn row_to_message(row: &libsql::Row) -> Result<Message, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let patient_id: Option<String> = row.get(1).ok();
    let session_id: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let sender_str: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let content: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
    let timestamp_str: String = row
        .get(7)
        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;

    Ok(Message {
        id,
        patient_id: patient_id.as_deref().map(parse_uuid).transpose()?,
        session_id,
        sender: sender_str.parse().map_err(DatabaseError::Query)?,
        content,
        translated_content: row.get(5).ok(),
        language: row.get(6).ok(),
        timestamp: parse_datetime(&timestamp_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

const PATIENT_COLUMNS: &str = "id, phone_number, name, language, created_at";

const MESSAGE_COLUMNS: &str =
    "id, patient_id, session_id, sender, content, translated_content, language, timestamp";

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Patients ────────────────────────────────────────────────────

    async fn insert_patient_if_absent(
        &self,
        phone_number: &str,
        language: &str,
    ) -> Result<bool, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let inserted = self
            .conn()
            .execute(
                "INSERT INTO patients (id, phone_number, language, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(phone_number) DO NOTHING",
                params![id.clone(), phone_number, language, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_patient_if_absent: {e}")))?;

        if inserted > 0 {
            debug!(id = %id, phone_number, language, "Patient inserted into DB");
        }
        Ok(inserted > 0)
    }

    async fn get_patient_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Patient>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE phone_number = ?1"),
                params![phone_number],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_patient_by_phone: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_patient(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_patient_by_phone: {e}"))),
        }
    }

    async fn update_patient_language(
        &self,
        id: Uuid,
        language: &str,
    ) -> Result<(), DatabaseError> {
        let updated = self
            .conn()
            .execute(
                "UPDATE patients SET language = ?1 WHERE id = ?2",
                params![language, id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_patient_language: {e}")))?;

        if updated == 0 {
            return Err(DatabaseError::NotFound {
                entity: "patient".into(),
                id: id.to_string(),
            });
        }
        debug!(id = %id, language, "Patient language updated in DB");
        Ok(())
    }

    // ── Messages ────────────────────────────────────────────────────

    async fn append_message(&self, message: NewMessage<'_>) -> Result<Message, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO messages (patient_id, session_id, sender, content,
                        translated_content, language, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     RETURNING {MESSAGE_COLUMNS}"
                ),
                params![
                    message.patient_id.to_string(),
                    message.session_id,
                    message.sender.as_str(),
                    message.content,
                    opt_text(message.translated_content),
                    opt_text(message.language),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("append_message: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("append_message: {e}")))?
            .ok_or_else(|| DatabaseError::Query("append_message: no row returned".into()))?;
        let stored = row_to_message(&row)?;

        debug!(
            id = stored.id,
            session_id = %stored.session_id,
            sender = stored.sender.as_str(),
            "Message appended to transcript"
        );
        Ok(stored)
    }

    async fn list_session_messages(
        &self,
        session_id: &str,
    ) -> Result<Vec<Message>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_id = ?1 ORDER BY id ASC"
                ),
                params![session_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_session_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_session_messages: {e}")))?
        {
            messages.push(row_to_message(&row)?);
        }
        Ok(messages)
    }
}
