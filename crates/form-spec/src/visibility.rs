use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::answers::AnswerSet;
use crate::spec::field::FieldDefinition;

pub type VisibilityMap = BTreeMap<String, bool>;

/// Visibility of one field against the current answers. Fields without a
/// rule are always shown; a rule that cannot be satisfied hides the field.
pub fn is_visible(field: &FieldDefinition, answers: &AnswerSet) -> bool {
    field
        .visibility_rule
        .as_ref()
        .is_none_or(|rule| rule.evaluate(answers))
}

/// Evaluates every field independently against `answers`.
pub fn compute_visibility(fields: &[FieldDefinition], answers: &AnswerSet) -> VisibilityMap {
    fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, answers)))
        .collect()
}

/// Removes answers for hidden fields and for ids that name no field.
///
/// A pruned answer can hide a field further down the chain, so visibility is
/// recomputed from the pruned set until a round removes nothing. Every
/// productive round drops at least one entry, which bounds the loop by the
/// number of fields.
pub fn prune_answers(fields: &[FieldDefinition], answers: &AnswerSet) -> AnswerSet {
    let known: BTreeSet<&str> = fields.iter().map(|field| field.id.as_str()).collect();
    let mut pruned = answers.clone();
    pruned.retain(|id, _| {
        let keep = known.contains(id);
        if !keep {
            debug!(field = id, "dropping answer for unknown field");
        }
        keep
    });

    for _ in 0..=fields.len() {
        let visibility = compute_visibility(fields, &pruned);
        let before = pruned.len();
        pruned.retain(|id, _| {
            let keep = visibility.get(id).copied().unwrap_or(false);
            if !keep {
                debug!(field = id, "pruning answer for hidden field");
            }
            keep
        });
        if pruned.len() == before {
            break;
        }
    }

    pruned
}

/// Pruned answers together with the visibility they produce.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Resolution {
    pub visibility: VisibilityMap,
    pub answers: AnswerSet,
}

impl Resolution {
    pub fn is_visible(&self, id: &str) -> bool {
        self.visibility.get(id).copied().unwrap_or(false)
    }

    pub fn visible_ids(&self) -> impl Iterator<Item = &str> {
        self.visibility
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(id, _)| id.as_str())
    }

    pub fn hidden_ids(&self) -> impl Iterator<Item = &str> {
        self.visibility
            .iter()
            .filter(|(_, visible)| !**visible)
            .map(|(id, _)| id.as_str())
    }
}

/// Prunes `answers` and recomputes visibility from what survives. This is
/// the state a response surface renders and submits.
pub fn resolve(fields: &[FieldDefinition], answers: &AnswerSet) -> Resolution {
    let answers = prune_answers(fields, answers);
    let visibility = compute_visibility(fields, &answers);
    debug!(
        fields = fields.len(),
        answers = answers.len(),
        "resolved visibility"
    );
    Resolution {
        visibility,
        answers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, Operator};
    use serde_json::json;

    fn chain() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::single_choice("a", "A", ["Yes", "No"]),
            FieldDefinition::free_text("b", "B")
                .with_rule(Condition::new("a", Operator::Equals, "Yes")),
            FieldDefinition::free_text("c", "C")
                .with_rule(Condition::new("b", Operator::Equals, "go")),
            FieldDefinition::free_text("d", "D")
                .with_rule(Condition::new("c", Operator::Equals, "go")),
        ]
    }

    #[test]
    fn pruning_cascades_through_a_chain() {
        let fields = chain();
        let answers =
            AnswerSet::from_value(&json!({ "a": "No", "b": "go", "c": "go", "d": "kept?" }))
                .expect("answers");
        let pruned = prune_answers(&fields, &answers);
        assert_eq!(pruned.ids().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn unknown_answer_keys_are_dropped() {
        let fields = chain();
        let answers = AnswerSet::from_value(&json!({ "a": "Yes", "zzz": 1 })).expect("answers");
        let pruned = prune_answers(&fields, &answers);
        assert!(!pruned.contains("zzz"));
        assert!(pruned.contains("a"));
    }

    #[test]
    fn resolution_reports_hidden_ids() {
        let fields = chain();
        let answers = AnswerSet::from_value(&json!({ "a": "Yes", "b": "stop" })).expect("answers");
        let resolution = resolve(&fields, &answers);
        assert_eq!(resolution.visible_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(resolution.hidden_ids().collect::<Vec<_>>(), vec!["c", "d"]);
    }
}
