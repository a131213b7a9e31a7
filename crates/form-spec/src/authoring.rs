//! Helpers for form builders. They mirror the validator's forward-only rule
//! so that invalid dependencies are hard to build in the first place.

use crate::spec::field::FieldDefinition;

/// Fields a rule on `fields[index]` may depend on: those strictly before it.
pub fn dependency_candidates(fields: &[FieldDefinition], index: usize) -> &[FieldDefinition] {
    &fields[..index.min(fields.len())]
}

/// Indices of fields whose rule no longer points at an earlier field.
pub fn stale_rules(fields: &[FieldDefinition]) -> Vec<usize> {
    fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            let rule = field.visibility_rule.as_ref()?;
            let points_back = dependency_candidates(fields, index)
                .iter()
                .any(|candidate| candidate.id == rule.depends_on);
            (!points_back).then_some(index)
        })
        .collect()
}

/// Moves the field at `from` to position `to` (both clamped) and returns the
/// rules the reorder left stale.
pub fn move_field(fields: &mut Vec<FieldDefinition>, from: usize, to: usize) -> Vec<usize> {
    if fields.is_empty() {
        return Vec::new();
    }
    let from = from.min(fields.len() - 1);
    let field = fields.remove(from);
    let to = to.min(fields.len());
    fields.insert(to, field);
    stale_rules(fields)
}
