use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use form_spec::{
    AnswerError, AnswerReport, AnswerSet, FormSchema, RenderPayload, build_render_payload,
    check_answers as spec_check_answers, dependency_candidates as spec_dependency_candidates,
    render_json_ui as spec_render_json_ui, render_text as spec_render_text, resolve,
};

const DEFAULT_SCHEMA: &str = include_str!("../../form-spec/tests/fixtures/feedback_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse input: {0}")]
    InputParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("field '{field}' is not part of form '{form}'")]
    UnknownField { form: String, field: String },
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Answers(#[from] AnswerError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_schema_json: Option<String>,
}

fn load_form_schema(config_json: &str) -> Result<FormSchema, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let schema_json = config.form_schema_json.as_deref().unwrap_or(DEFAULT_SCHEMA);

    serde_json::from_str(schema_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSchema, ComponentError> {
    let schema = load_form_schema(config_json)?;
    if schema.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(schema)
    }
}

/// Blank or malformed answer input is treated as "nothing answered yet".
fn parse_answers(answers_json: &str) -> AnswerSet {
    serde_json::from_str::<Value>(answers_json)
        .ok()
        .and_then(|value| AnswerSet::from_value(&value).ok())
        .unwrap_or_default()
}

fn parse_answers_strict(answers_json: &str) -> Result<AnswerSet, ComponentError> {
    let value: Value = serde_json::from_str(answers_json).map_err(ComponentError::InputParse)?;
    Ok(AnswerSet::from_value(&value)?)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|schema| serde_json::to_value(schema).map_err(ComponentError::JsonEncode)),
    )
}

/// Runs the pre-save gate on a schema document.
pub fn validate_schema(schema_json: &str) -> String {
    respond(
        serde_json::from_str::<FormSchema>(schema_json)
            .map_err(ComponentError::InputParse)
            .and_then(|schema| {
                let (valid, reasons) = match schema.validate() {
                    Ok(()) => (true, Vec::new()),
                    Err(violation) => (false, violation.reasons),
                };
                let messages: Vec<String> = reasons.iter().map(ToString::to_string).collect();
                let reasons = serde_json::to_value(&reasons).map_err(ComponentError::JsonEncode)?;
                Ok(json!({
                    "valid": valid,
                    "messages": messages,
                    "reasons": reasons,
                }))
            }),
    )
}

/// Ids a rule on `fields[index]` may depend on.
pub fn dependency_candidates(schema_json: &str, index: usize) -> String {
    respond(
        serde_json::from_str::<FormSchema>(schema_json)
            .map_err(ComponentError::InputParse)
            .map(|schema| {
                let ids: Vec<Value> = spec_dependency_candidates(&schema.fields, index)
                    .iter()
                    .map(|field| Value::String(field.id.clone()))
                    .collect();
                Value::Array(ids)
            }),
    )
}

pub fn visibility(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let resolution = resolve(&schema.fields, &parse_answers(answers_json));
        serde_json::to_value(resolution).map_err(ComponentError::JsonEncode)
    }))
}

pub fn prune(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let answers = parse_answers_strict(answers_json)?;
        Ok(resolve(&schema.fields, &answers).answers.to_value())
    }))
}

pub fn check_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let answers = parse_answers_strict(answers_json)?;
        serde_json::to_value(spec_check_answers(&schema.fields, &answers))
            .map_err(ComponentError::JsonEncode)
    }))
}

fn render_payload(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
) -> Result<RenderPayload, ComponentError> {
    let schema = ensure_form(form_id, config_json)?;
    Ok(build_render_payload(&schema, &parse_answers(answers_json)))
}

pub fn render_text(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond_string(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| spec_render_text(&payload)),
    )
}

pub fn render_json_ui(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| spec_render_json_ui(&payload)),
    )
}

fn submission_progress(payload: &RenderPayload) -> Value {
    json!({
        "answered": payload.progress.answered,
        "total": payload.progress.total,
    })
}

fn build_error_response(
    payload: &RenderPayload,
    report: &AnswerReport,
) -> Result<Value, ComponentError> {
    let validation = serde_json::to_value(report).map_err(ComponentError::JsonEncode)?;
    Ok(json!({
        "status": "error",
        "next_field_id": payload.next_field_id,
        "progress": submission_progress(payload),
        "answers": payload.answers.to_value(),
        "validation": validation,
    }))
}

fn build_success_response(payload: &RenderPayload) -> Value {
    let visible: Map<String, Value> = payload
        .fields
        .iter()
        .map(|field| (field.id.clone(), Value::Bool(field.visible)))
        .collect();
    json!({
        "status": payload.status.as_str(),
        "next_field_id": payload.next_field_id,
        "progress": submission_progress(payload),
        "answers": payload.answers.to_value(),
        "visibility": visible,
    })
}

/// Applies one answer change and re-resolves the whole form.
pub fn submit_patch(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    field_id: &str,
    value_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        if schema.field(field_id).is_none() {
            return Err(ComponentError::UnknownField {
                form: schema.id.clone(),
                field: field_id.to_string(),
            });
        }
        let value: Value = serde_json::from_str(value_json).map_err(ComponentError::InputParse)?;
        let mut answers = parse_answers(answers_json);
        if value.is_null() {
            answers.remove(field_id);
        } else {
            answers.insert(field_id, value);
        }
        let payload = build_render_payload(&schema, &answers);
        let report = spec_check_answers(&schema.fields, &answers);

        if !report.errors.is_empty() || !report.unknown_fields.is_empty() {
            return build_error_response(&payload, &report);
        }
        Ok(build_success_response(&payload))
    }))
}

/// Final submission check: the pruned answers must satisfy every visible field.
pub fn submit_all(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|schema| {
        let answers = parse_answers_strict(answers_json)?;
        let payload = build_render_payload(&schema, &answers);
        let report = spec_check_answers(&schema.fields, &answers);

        if !report.valid {
            return build_error_response(&payload, &report);
        }
        Ok(build_success_response(&payload))
    }))
}
