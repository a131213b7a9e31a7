use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::condition::coerce_number;
use crate::spec::field::{FieldDefinition, FieldKind};
use crate::visibility::resolve;

/// Rating scale used when a field has no positive `max`.
const DEFAULT_RATING_MAX: i64 = 5;

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answers must be a JSON object")]
    NotAnObject,
    #[error("cbor encode/decode error: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Answers entered so far, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AnswerSet {
    entries: BTreeMap<String, Value>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: &Value) -> Result<Self, AnswerError> {
        match value {
            Value::Object(map) => Ok(map
                .iter()
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect()),
            Value::Null => Ok(Self::new()),
            _ => Err(AnswerError::NotAnObject),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(id, value)| (id.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    /// Present and non-null.
    pub fn answered(&self, id: &str) -> Option<&Value> {
        self.entries.get(id).filter(|value| !value.is_null())
    }

    pub fn insert(&mut self, id: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(id.into(), value)
    }

    pub fn remove(&mut self, id: &str) -> Option<Value> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.entries.retain(|id, value| keep(id, value));
    }

    pub fn to_json_pretty(&self) -> Result<String, AnswerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, AnswerError> {
        Ok(serde_cbor::to_vec(self)?)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, AnswerError> {
        Ok(serde_cbor::from_slice(bytes)?)
    }
}

impl FromIterator<(String, Value)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A problem with one submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerIssue {
    pub field_id: String,
    pub path: String,
    pub message: String,
    pub code: String,
}

/// Outcome of [`check_answers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReport {
    pub valid: bool,
    pub errors: Vec<AnswerIssue>,
    pub missing_required: Vec<String>,
    pub unknown_fields: Vec<String>,
}

/// Checks answers the way a submit gate would: only fields visible after
/// pruning are inspected, hidden answers are ignored rather than rejected.
pub fn check_answers(fields: &[FieldDefinition], answers: &AnswerSet) -> AnswerReport {
    let unknown_fields: Vec<String> = answers
        .ids()
        .filter(|id| !fields.iter().any(|field| field.id == *id))
        .map(String::from)
        .collect();

    let resolution = resolve(fields, answers);
    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in fields {
        if !resolution.is_visible(&field.id) {
            continue;
        }
        match resolution.answers.answered(&field.id) {
            Some(value) if !is_empty(value) => {
                if let Some(issue) = check_value(field, value) {
                    errors.push(issue);
                }
            }
            _ => {
                if field.required {
                    missing_required.push(field.id.clone());
                }
            }
        }
    }

    AnswerReport {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_value(field: &FieldDefinition, value: &Value) -> Option<AnswerIssue> {
    match field.kind {
        FieldKind::FreeText => {
            if !value.is_string() {
                return Some(issue(field, "must be a string", "type_mismatch"));
            }
        }
        FieldKind::SingleChoice => {
            let Some(choice) = value.as_str() else {
                return Some(issue(field, "must be a string", "type_mismatch"));
            };
            if !field.options().iter().any(|option| option == choice) {
                return Some(issue(
                    field,
                    &format!("must be one of {}", field.options().join(", ")),
                    "invalid_option",
                ));
            }
        }
        FieldKind::MultiChoice => {
            let Some(items) = value.as_array() else {
                return Some(issue(field, "must be an array of strings", "type_mismatch"));
            };
            for item in items {
                let Some(choice) = item.as_str() else {
                    return Some(issue(field, "must be an array of strings", "type_mismatch"));
                };
                if !field.options().iter().any(|option| option == choice) {
                    return Some(issue(
                        field,
                        &format!("contains invalid option '{}'", choice),
                        "invalid_option",
                    ));
                }
            }
        }
        FieldKind::Rating => {
            if !value.is_number() {
                return Some(issue(field, "must be a number", "type_mismatch"));
            }
            let max = field
                .max
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_RATING_MAX);
            let rating = coerce_number(value)?;
            if rating < 1.0 || rating > max as f64 {
                return Some(issue(
                    field,
                    &format!("rating must be between 1 and {}", max),
                    "out_of_range",
                ));
            }
        }
    }
    None
}

fn issue(field: &FieldDefinition, message: &str, code: &str) -> AnswerIssue {
    AnswerIssue {
        field_id: field.id.clone(),
        path: format!("/{}", field.id),
        message: message.into(),
        code: code.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(AnswerSet::from_value(&json!([1, 2])).is_err());
        assert!(AnswerSet::from_value(&json!(null)).expect("null").is_empty());
    }

    #[test]
    fn answered_skips_null_entries() {
        let mut answers = AnswerSet::new();
        answers.insert("a", Value::Null);
        assert!(answers.contains("a"));
        assert!(answers.answered("a").is_none());
    }

    #[test]
    fn cbor_encoding_preserves_entries() {
        let answers = AnswerSet::from_value(&json!({ "a": "Yes", "b": ["X"], "c": 4 }))
            .expect("answers");
        let bytes = answers.to_cbor().expect("encode");
        assert_eq!(AnswerSet::from_cbor(&bytes).expect("decode"), answers);
    }
}
