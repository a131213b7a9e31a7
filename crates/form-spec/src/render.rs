use serde_json::{Map, Value, json};

use crate::{
    answers::AnswerSet,
    condition::display_value,
    spec::{
        field::FieldKind,
        form::{FormSchema, FormStatus},
    },
    visibility::resolve,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible field is still unanswered.
    NeedInput,
    /// Every visible field has an answer.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters over visible fields.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Describes a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub visible: bool,
    pub current_value: Option<Value>,
    pub options: Option<Vec<String>>,
    pub max: Option<i64>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_status: FormStatus,
    pub status: RenderStatus,
    pub next_field_id: Option<String>,
    pub progress: RenderProgress,
    pub fields: Vec<RenderField>,
    /// The pruned answers, i.e. exactly what a submission would carry.
    pub answers: AnswerSet,
}

/// Build the renderer payload from the schema and the raw answers.
pub fn build_render_payload(schema: &FormSchema, answers: &AnswerSet) -> RenderPayload {
    let resolution = resolve(&schema.fields, answers);

    let fields = schema
        .fields
        .iter()
        .map(|field| RenderField {
            id: field.id.clone(),
            label: field.label.clone(),
            kind: field.kind,
            required: field.required,
            visible: resolution.is_visible(&field.id),
            current_value: resolution.answers.answered(&field.id).cloned(),
            options: field.options.clone(),
            max: field.max,
        })
        .collect::<Vec<_>>();

    let visible = fields.iter().filter(|field| field.visible);
    let total = visible.clone().count();
    let answered = visible
        .clone()
        .filter(|field| field.current_value.is_some())
        .count();
    let next_field_id = visible
        .clone()
        .find(|field| field.current_value.is_none())
        .map(|field| field.id.clone());

    let status = if next_field_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        form_id: schema.id.clone(),
        form_title: schema.title.clone(),
        form_status: schema.status,
        status,
        next_field_id,
        progress: RenderProgress { answered, total },
        fields,
        answers: resolution.answers,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("kind".into(), Value::String(field.kind.as_str().to_string()));
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("visible".into(), Value::Bool(field.visible));
            if let Some(current_value) = &field.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if let Some(options) = &field.options {
                map.insert(
                    "options".into(),
                    Value::Array(options.iter().cloned().map(Value::String).collect()),
                );
            }
            if let Some(max) = field.max {
                map.insert("max".into(), Value::from(max));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_status": payload.form_status.as_str(),
        "status": payload.status.as_str(),
        "next_field_id": payload.next_field_id,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "fields": fields,
        "answers": payload.answers.to_value(),
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Form: {} ({}, {})",
        payload.form_title,
        payload.form_id,
        payload.form_status.as_str()
    ));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    match &payload.next_field_id {
        Some(next_field) => lines.push(format!("Next field: {}", next_field)),
        None => lines.push("All visible fields are answered.".to_string()),
    }

    lines.push("Visible fields:".to_string());
    for field in payload.fields.iter().filter(|field| field.visible) {
        let mut entry = format!(" - {} ({})", field.id, field.label);
        if field.required {
            entry.push_str(" [required]");
        }
        if let Some(current_value) = &field.current_value {
            entry.push_str(&format!(" = {}", display_value(current_value)));
        }
        lines.push(entry);
    }

    let hidden: Vec<&str> = payload
        .fields
        .iter()
        .filter(|field| !field.visible)
        .map(|field| field.id.as_str())
        .collect();
    if !hidden.is_empty() {
        lines.push(format!("Hidden fields: {}", hidden.join(", ")));
    }

    lines.join("\n")
}
