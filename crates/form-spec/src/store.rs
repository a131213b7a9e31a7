//! Contract with the persistence/analytics collaborator. Storage and
//! aggregation live behind these traits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::AnalyticsSnapshot;
use crate::answers::AnswerSet;
use crate::spec::form::FormSchema;
use crate::validate::SchemaViolation;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("form '{0}' not found")]
    NotFound(String),
    #[error("form '{0}' is not published")]
    NotPublished(String),
    #[error(transparent)]
    Schema(#[from] SchemaViolation),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Acknowledgement returned when a response is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
    #[serde(alias = "formId")]
    pub form_id: String,
    #[serde(alias = "id")]
    pub response_id: String,
    #[serde(default)]
    pub created: i64,
}

/// Persistence side of the system.
pub trait FormStore {
    fn save(&mut self, schema: FormSchema) -> Result<String, StoreError>;
    fn load(&self, form_id: &str) -> Result<FormSchema, StoreError>;
    /// Records one response. Callers pass the pruned answer set only.
    fn submit(&mut self, form_id: &str, answers: AnswerSet) -> Result<SubmissionAck, StoreError>;
    fn snapshot(&self, form_id: &str) -> Result<AnalyticsSnapshot, StoreError>;
}

/// Receives a fresh snapshot each time a response is recorded.
pub trait SnapshotListener {
    fn on_snapshot(&mut self, snapshot: &AnalyticsSnapshot);
}

impl<F> SnapshotListener for F
where
    F: FnMut(&AnalyticsSnapshot),
{
    fn on_snapshot(&mut self, snapshot: &AnalyticsSnapshot) {
        self(snapshot)
    }
}

/// Push channel for snapshot updates.
pub trait SnapshotFeed {
    fn subscribe(&mut self, form_id: &str, listener: Box<dyn SnapshotListener>);
}

/// Saves `schema` only if it passes validation.
pub fn save_validated<S>(store: &mut S, schema: FormSchema) -> Result<String, StoreError>
where
    S: FormStore + ?Sized,
{
    schema.validate()?;
    store.save(schema)
}
