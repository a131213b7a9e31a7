use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldDefinition;
use crate::validate::{SchemaViolation, Violation, collect_violations};

/// Publication state of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    #[default]
    Draft,
    Published,
}

impl FormStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormStatus::Draft => "draft",
            FormStatus::Published => "published",
        }
    }
}

/// Top-level form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSchema {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: FormStatus,
    pub fields: Vec<FieldDefinition>,
}

impl FormSchema {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: FormStatus::Draft,
            fields,
        }
    }

    pub fn published(mut self) -> Self {
        self.status = FormStatus::Published;
        self
    }

    pub fn is_published(&self) -> bool {
        self.status == FormStatus::Published
    }

    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Pre-save gate: the title check plus every field-level check.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        let mut reasons = Vec::new();
        if self.title.trim().is_empty() {
            reasons.push(Violation::MissingTitle);
        }
        reasons.extend(collect_violations(&self.fields));
        SchemaViolation::from_reasons(reasons)
    }
}
