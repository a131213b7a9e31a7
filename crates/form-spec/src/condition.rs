use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::AnswerSet;

/// Comparison operator used by a visibility rule.
///
/// Unknown labels are kept as [`Operator::Unrecognized`] instead of failing
/// deserialization, so schema validation can report them and evaluation can
/// treat them as "hidden".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    Includes,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Unrecognized(String),
}

impl Operator {
    pub const RECOGNIZED: [Operator; 7] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Includes,
        Operator::Greater,
        Operator::GreaterOrEqual,
        Operator::Less,
        Operator::LessOrEqual,
    ];

    /// Parses a label, accepting the short `eq`/`ne`/`gt`/`gte`/`lt`/`lte` forms.
    pub fn parse(label: &str) -> Self {
        match label {
            "equals" | "eq" => Operator::Equals,
            "not_equals" | "ne" => Operator::NotEquals,
            "includes" => Operator::Includes,
            "greater" | "gt" => Operator::Greater,
            "greater_or_equal" | "gte" => Operator::GreaterOrEqual,
            "less" | "lt" => Operator::Less,
            "less_or_equal" | "lte" => Operator::LessOrEqual,
            other => Operator::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Includes => "includes",
            Operator::Greater => "greater",
            Operator::GreaterOrEqual => "greater_or_equal",
            Operator::Less => "less",
            Operator::LessOrEqual => "less_or_equal",
            Operator::Unrecognized(label) => label,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Operator::Unrecognized(_))
    }

    /// Applies the operator to a present dependency answer. Never fails:
    /// anything that cannot be compared yields `false`.
    pub fn test(&self, answer: &Value, comparand: &Value) -> bool {
        match self {
            Operator::Equals => loose_eq(answer, comparand),
            Operator::NotEquals => !loose_eq(answer, comparand),
            Operator::Includes => includes(answer, comparand),
            Operator::Greater => numeric_cmp(answer, comparand, |a, b| a > b),
            Operator::GreaterOrEqual => numeric_cmp(answer, comparand, |a, b| a >= b),
            Operator::Less => numeric_cmp(answer, comparand, |a, b| a < b),
            Operator::LessOrEqual => numeric_cmp(answer, comparand, |a, b| a <= b),
            Operator::Unrecognized(_) => false,
        }
    }
}

impl From<String> for Operator {
    fn from(label: String) -> Self {
        Operator::parse(&label)
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        operator.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility rule attached to a field: the field is shown only when the
/// answer to `depends_on` satisfies `operator` against `comparand`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    #[serde(alias = "dependsOn", alias = "fieldId")]
    pub depends_on: String,
    #[serde(alias = "op")]
    #[schemars(with = "String")]
    pub operator: Operator,
    #[serde(default, alias = "value")]
    pub comparand: Value,
}

impl Condition {
    pub fn new(
        depends_on: impl Into<String>,
        operator: Operator,
        comparand: impl Into<Value>,
    ) -> Self {
        Self {
            depends_on: depends_on.into(),
            operator,
            comparand: comparand.into(),
        }
    }

    /// An unanswered dependency (missing or `null`) always evaluates to `false`.
    pub fn evaluate(&self, answers: &AnswerSet) -> bool {
        match answers.answered(&self.depends_on) {
            Some(answer) => self.operator.test(answer, &self.comparand),
            None => false,
        }
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.trim() == b.trim(),
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => display_value(left) == display_value(right),
    }
}

fn includes(haystack: &Value, needle: &Value) -> bool {
    let Value::Array(items) = haystack else {
        return false;
    };
    let needle = display_value(needle);
    items.iter().any(|item| display_value(item) == needle)
}

fn numeric_cmp(left: &Value, right: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (coerce_number(left), coerce_number(right)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Numbers pass through; strings are trimmed and parsed. Everything else,
/// empty strings and non-finite results fail.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// String rendering used when values of different kinds are compared.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match (number.as_i64(), number.as_u64(), number.as_f64()) {
            (Some(int), _, _) => int.to_string(),
            (_, Some(uint), _) => uint.to_string(),
            (_, _, Some(float)) if float.fract() == 0.0 && float.abs() < 9.0e15 => {
                format!("{}", float as i64)
            }
            (_, _, Some(float)) => float.to_string(),
            _ => number.to_string(),
        },
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_labels_parse_to_canonical_operators() {
        assert_eq!(Operator::parse("eq"), Operator::Equals);
        assert_eq!(Operator::parse("gte"), Operator::GreaterOrEqual);
        assert_eq!(Operator::parse("less_or_equal").as_str(), "less_or_equal");
    }

    #[test]
    fn unknown_operator_round_trips() {
        let condition: Condition = serde_json::from_value(json!({
            "depends_on": "a",
            "operator": "matches",
            "comparand": "x"
        }))
        .expect("deserialize");
        assert_eq!(
            condition.operator,
            Operator::Unrecognized("matches".to_string())
        );
        let encoded = serde_json::to_value(&condition).expect("serialize");
        assert_eq!(encoded["operator"], "matches");
        assert!(!condition.operator.test(&json!("x"), &json!("x")));
    }

    #[test]
    fn legacy_rule_keys_are_accepted() {
        let condition: Condition = serde_json::from_value(json!({
            "fieldId": "a",
            "op": "ne",
            "value": "No"
        }))
        .expect("deserialize");
        assert_eq!(condition.depends_on, "a");
        assert_eq!(condition.operator, Operator::NotEquals);
        assert_eq!(condition.comparand, json!("No"));
    }

    #[test]
    fn equals_trims_strings_and_compares_numbers() {
        assert!(Operator::Equals.test(&json!("  Yes "), &json!("Yes")));
        assert!(Operator::Equals.test(&json!(5), &json!(5.0)));
        assert!(Operator::Equals.test(&json!(5), &json!("5")));
        assert!(Operator::Equals.test(&json!(true), &json!("true")));
        assert!(!Operator::Equals.test(&json!("No"), &json!("Yes")));
        assert!(Operator::NotEquals.test(&json!("No"), &json!("Yes")));
    }

    #[test]
    fn includes_requires_an_array() {
        assert!(Operator::Includes.test(&json!(["X", "Y"]), &json!("Y")));
        assert!(Operator::Includes.test(&json!([1, 2]), &json!("2")));
        assert!(!Operator::Includes.test(&json!(["X"]), &json!("Y")));
        assert!(!Operator::Includes.test(&json!("Y"), &json!("Y")));
        assert!(!Operator::Includes.test(&json!({"Y": true}), &json!("Y")));
    }

    #[test]
    fn numeric_operators_coerce_or_fail_closed() {
        assert!(Operator::Greater.test(&json!(5), &json!(3)));
        assert!(Operator::Greater.test(&json!(" 5 "), &json!("3")));
        assert!(Operator::LessOrEqual.test(&json!(3), &json!(3)));
        assert!(!Operator::Greater.test(&json!("abc"), &json!(3)));
        assert!(!Operator::Less.test(&json!(1), &json!("")));
        assert!(!Operator::Less.test(&json!([1]), &json!(2)));
        assert!(!Operator::GreaterOrEqual.test(&json!("NaN"), &json!(0)));
        assert!(!Operator::Less.test(&json!(null), &json!(2)));
    }

    #[test]
    fn display_renders_integral_floats_without_fraction() {
        assert_eq!(display_value(&json!(5.0)), "5");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!(["a", 1])), "a,1");
        assert_eq!(display_value(&json!(null)), "");
    }
}
