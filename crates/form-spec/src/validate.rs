use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::Serialize;
use thiserror::Error;

use crate::condition::Condition;
use crate::spec::field::{FieldDefinition, FieldKind};

/// One reason a schema cannot be saved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Violation {
    #[error("form must contain at least one field")]
    NoFields,
    #[error("form title is required")]
    MissingTitle,
    #[error("fields[{index}]: id is required")]
    MissingId { index: usize },
    #[error("fields[{index}] ({id}): label is required")]
    MissingLabel { index: usize, id: String },
    #[error("fields[{index}] ({id}): {kind} requires non-empty options")]
    MissingOptions {
        index: usize,
        id: String,
        kind: FieldKind,
    },
    #[error("fields[{index}] ({id}): rating requires a positive max")]
    InvalidMax {
        index: usize,
        id: String,
        max: Option<i64>,
    },
    #[error("fields[{index}]: id '{id}' already used by fields[{first}]")]
    DuplicateId {
        index: usize,
        id: String,
        first: usize,
    },
    #[error("fields[{index}] ({id}): visibility rule depends on unknown field '{depends_on}'")]
    UnknownDependency {
        index: usize,
        id: String,
        depends_on: String,
    },
    #[error("fields[{index}] ({id}): '{depends_on}' (fields[{dependency}]) is not earlier")]
    ForwardDependency {
        index: usize,
        id: String,
        depends_on: String,
        dependency: usize,
    },
    #[error("fields[{index}] ({id}): unrecognized operator '{operator}'")]
    UnknownOperator {
        index: usize,
        id: String,
        operator: String,
    },
}

/// Every reason a schema was rejected, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema rejected: {}", summarize(.reasons))]
pub struct SchemaViolation {
    pub reasons: Vec<Violation>,
}

impl SchemaViolation {
    pub(crate) fn from_reasons(reasons: Vec<Violation>) -> Result<(), SchemaViolation> {
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation { reasons })
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }
}

fn summarize(reasons: &[Violation]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Decides whether an ordered field list can be saved.
pub fn validate(fields: &[FieldDefinition]) -> Result<(), SchemaViolation> {
    SchemaViolation::from_reasons(collect_violations(fields))
}

/// All violations for `fields`; empty when the list is saveable.
pub fn collect_violations(fields: &[FieldDefinition]) -> Vec<Violation> {
    if fields.is_empty() {
        return vec![Violation::NoFields];
    }

    let mut reasons = Vec::new();
    let mut first_seen: HashMap<&str, usize> = HashMap::new();

    for (index, field) in fields.iter().enumerate() {
        if field.id.trim().is_empty() {
            reasons.push(Violation::MissingId { index });
        } else {
            match first_seen.entry(field.id.as_str()) {
                Entry::Occupied(entry) => reasons.push(Violation::DuplicateId {
                    index,
                    id: field.id.clone(),
                    first: *entry.get(),
                }),
                Entry::Vacant(entry) => {
                    entry.insert(index);
                }
            }
        }

        if field.label.trim().is_empty() {
            reasons.push(Violation::MissingLabel {
                index,
                id: field.id.clone(),
            });
        }

        if field.kind.is_choice() && field.options().is_empty() {
            reasons.push(Violation::MissingOptions {
                index,
                id: field.id.clone(),
                kind: field.kind,
            });
        }

        if field.kind == FieldKind::Rating && !field.max.is_some_and(|max| max > 0) {
            reasons.push(Violation::InvalidMax {
                index,
                id: field.id.clone(),
                max: field.max,
            });
        }

        if let Some(rule) = &field.visibility_rule {
            check_rule(fields, index, field, rule, &mut reasons);
        }
    }

    reasons
}

fn check_rule(
    fields: &[FieldDefinition],
    index: usize,
    field: &FieldDefinition,
    rule: &Condition,
    reasons: &mut Vec<Violation>,
) {
    match fields
        .iter()
        .position(|candidate| candidate.id == rule.depends_on)
    {
        None => reasons.push(Violation::UnknownDependency {
            index,
            id: field.id.clone(),
            depends_on: rule.depends_on.clone(),
        }),
        Some(dependency) if dependency >= index => reasons.push(Violation::ForwardDependency {
            index,
            id: field.id.clone(),
            depends_on: rule.depends_on.clone(),
            dependency,
        }),
        Some(_) => {}
    }

    if !rule.operator.is_recognized() {
        reasons.push(Violation::UnknownOperator {
            index,
            id: field.id.clone(),
            operator: rule.operator.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Operator;

    #[test]
    fn self_reference_is_a_forward_dependency() {
        let fields = vec![
            FieldDefinition::free_text("a", "A")
                .with_rule(Condition::new("a", Operator::Equals, "x")),
        ];
        let err = validate(&fields).expect_err("self reference");
        assert!(matches!(
            err.reasons[0],
            Violation::ForwardDependency { dependency: 0, .. }
        ));
    }

    #[test]
    fn every_reason_is_collected() {
        let fields = vec![
            FieldDefinition::new(" ", FieldKind::SingleChoice, ""),
            FieldDefinition::new("r", FieldKind::Rating, "Rate"),
        ];
        let err = validate(&fields).expect_err("invalid");
        assert_eq!(err.reasons.len(), 4);
        assert!(err.to_string().contains("rating requires a positive max"));
    }

    #[test]
    fn violations_serialize_with_code_tag() {
        let value = serde_json::to_value(Violation::MissingId { index: 2 }).expect("json");
        assert_eq!(value["code"], "missing_id");
        assert_eq!(value["index"], 2);
    }
}
