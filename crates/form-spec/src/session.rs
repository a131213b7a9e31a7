use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::answers::AnswerSet;
use crate::spec::field::FieldDefinition;
use crate::spec::form::FormSchema;
use crate::store::{FormStore, StoreError, SubmissionAck};
use crate::visibility::{Resolution, VisibilityMap, resolve};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("field '{field}' is not part of form '{form}'")]
    UnknownField { form: String, field: String },
}

/// One respondent filling one form.
///
/// The held answers are always the pruned set: every mutation re-resolves
/// visibility over all fields before returning.
#[derive(Debug, Clone)]
pub struct ResponseSession {
    schema: FormSchema,
    resolution: Resolution,
}

impl ResponseSession {
    pub fn new(schema: FormSchema) -> Self {
        Self::with_answers(schema, &AnswerSet::new())
    }

    /// Starts from pre-filled answers; anything hidden is pruned right away.
    pub fn with_answers(schema: FormSchema, answers: &AnswerSet) -> Self {
        let resolution = resolve(&schema.fields, answers);
        Self { schema, resolution }
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.resolution.answers
    }

    pub fn visibility(&self) -> &VisibilityMap {
        &self.resolution.visibility
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.resolution.is_visible(id)
    }

    /// Visible fields in form order.
    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.schema
            .fields
            .iter()
            .filter(|field| self.resolution.is_visible(&field.id))
    }

    /// Records an answer and re-resolves. A `null` value clears the answer.
    pub fn set_answer(&mut self, id: &str, value: Value) -> Result<&Resolution, SessionError> {
        if self.schema.field(id).is_none() {
            return Err(SessionError::UnknownField {
                form: self.schema.id.clone(),
                field: id.to_string(),
            });
        }
        let mut answers = self.resolution.answers.clone();
        if value.is_null() {
            answers.remove(id);
        } else {
            answers.insert(id, value);
        }
        Ok(self.apply(answers))
    }

    pub fn clear_answer(&mut self, id: &str) -> &Resolution {
        let mut answers = self.resolution.answers.clone();
        answers.remove(id);
        self.apply(answers)
    }

    pub fn reset(&mut self) {
        self.resolution = resolve(&self.schema.fields, &AnswerSet::new());
    }

    /// Sends the pruned answers to `store` and starts over on success.
    pub fn submit<S>(&mut self, store: &mut S) -> Result<SubmissionAck, StoreError>
    where
        S: FormStore + ?Sized,
    {
        if !self.schema.is_published() {
            return Err(StoreError::NotPublished(self.schema.id.clone()));
        }
        let submission = self.resolution.answers.clone();
        debug!(
            form = %self.schema.id,
            answers = submission.len(),
            "submitting response"
        );
        let ack = store.submit(&self.schema.id, submission)?;
        self.reset();
        Ok(ack)
    }

    fn apply(&mut self, answers: AnswerSet) -> &Resolution {
        self.resolution = resolve(&self.schema.fields, &answers);
        &self.resolution
    }
}
