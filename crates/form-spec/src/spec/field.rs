use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;

/// Supported field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[serde(alias = "text")]
    FreeText,
    #[serde(alias = "multiple")]
    SingleChoice,
    #[serde(alias = "checkbox")]
    MultiChoice,
    Rating,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::FreeText => "free_text",
            FieldKind::SingleChoice => "single_choice",
            FieldKind::MultiChoice => "multi_choice",
            FieldKind::Rating => "rating",
        }
    }

    /// Choice kinds carry an option list.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::SingleChoice | FieldKind::MultiChoice)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question in a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    pub id: String,
    #[serde(alias = "type")]
    pub kind: FieldKind,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "visibilityRule",
        alias = "showIf"
    )]
    pub visibility_rule: Option<Condition>,
}

impl FieldDefinition {
    pub fn new(id: impl Into<String>, kind: FieldKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            required: false,
            options: None,
            max: None,
            visibility_rule: None,
        }
    }

    pub fn free_text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, FieldKind::FreeText, label)
    }

    pub fn single_choice<I, S>(id: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, FieldKind::SingleChoice, label).with_options(options)
    }

    pub fn multi_choice<I, S>(id: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, FieldKind::MultiChoice, label).with_options(options)
    }

    pub fn rating(id: impl Into<String>, label: impl Into<String>, max: i64) -> Self {
        Self::new(id, FieldKind::Rating, label).with_max(max)
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_rule(mut self, rule: Condition) -> Self {
        self.visibility_rule = Some(rule);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Options as a slice, empty when none are defined.
    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}
