//! Shape of the live analytics snapshot published by the persistence side.
//! Nothing here computes aggregates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::field::FieldKind;

/// Aggregated results for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    #[serde(alias = "formId")]
    pub form_id: String,
    pub count: u64,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldAnalytics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<Trends>,
}

impl AnalyticsSnapshot {
    pub fn empty(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            count: 0,
            fields: BTreeMap::new(),
            trends: None,
        }
    }

    pub fn field(&self, id: &str) -> Option<&FieldAnalytics> {
        self.fields.get(id)
    }
}

/// Per-field aggregate, tagged by field kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldAnalytics {
    #[serde(alias = "multiple")]
    SingleChoice { distribution: BTreeMap<String, u64> },
    #[serde(alias = "checkbox")]
    MultiChoice { distribution: BTreeMap<String, u64> },
    Rating {
        distribution: BTreeMap<u32, u64>,
        average: f64,
    },
    #[serde(alias = "text")]
    FreeText {
        #[serde(alias = "nonEmptyCount")]
        non_empty_count: u64,
    },
}

impl FieldAnalytics {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldAnalytics::SingleChoice { .. } => FieldKind::SingleChoice,
            FieldAnalytics::MultiChoice { .. } => FieldKind::MultiChoice,
            FieldAnalytics::Rating { .. } => FieldKind::Rating,
            FieldAnalytics::FreeText { .. } => FieldKind::FreeText,
        }
    }
}

/// Form-level summaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trends {
    #[serde(default, alias = "avgRating")]
    pub avg_rating: f64,
    #[serde(default, alias = "mostCommon")]
    pub most_common: BTreeMap<String, Value>,
    #[serde(default)]
    pub skipped: BTreeMap<String, u64>,
    #[serde(default, alias = "mostSkipped")]
    pub most_skipped: Vec<SkippedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedField {
    pub id: String,
    pub label: String,
    pub skipped: u64,
    pub total: u64,
}
