use std::fmt::Write;

use form_spec::{AnswerSet, FieldDefinition, FieldKind, ResponseSession};
use serde_json::Value;

/// Controls which bits of state the fill loop prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: progress, visible fields, pruned answers, parse expectations.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and state while a respondent fills a form.
pub struct FillPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, session: &ResponseSession) {
        if self.header_printed {
            return;
        }
        let schema = session.schema();
        println!("Form: {}", schema.title);
        if self.verbosity.is_verbose() {
            println!("Status: {}", schema.status.as_str());
        }
        self.header_printed = true;
    }

    pub fn show_status(&self, session: &ResponseSession) {
        if !self.verbosity.is_verbose() {
            return;
        }
        println!("Visible fields:");
        for field in session.visible_fields() {
            let mut entry = format!(" - {} ({})", field.id, field.label);
            if field.required {
                entry.push_str(" [required]");
            }
            if session.answers().contains(&field.id) {
                entry.push_str(" [answered]");
            }
            println!("{}", entry);
        }
    }

    pub fn show_pruned(&self, pruned: &[String]) {
        if pruned.is_empty() {
            return;
        }
        if self.verbosity.is_verbose() {
            println!("Discarded answers for hidden fields: {}", pruned.join(", "));
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = if prompt.total > 0 {
            format!("{}/{} {}", prompt.index, prompt.total, prompt.label)
        } else {
            format!("{} {}", prompt.index, prompt.label)
        };
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if self.verbosity.is_verbose() && !prompt.options.is_empty() {
            println!("Options: {}", prompt.options.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_completion(&self, answers: &AnswerSet) {
        println!("Done ✅");
        match answers.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        if self.show_answers_json {
            match answers.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize answers to JSON: {}", err);
                }
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub required: bool,
    pub hint: Option<String>,
    pub options: Vec<String>,
}

impl PromptContext {
    pub fn new(field: &FieldDefinition, answered: usize, total: usize) -> Self {
        Self {
            index: (answered + 1).max(1),
            total,
            label: field.label.clone(),
            required: field.required,
            hint: hint(field),
            options: field.options().to_vec(),
        }
    }
}

fn hint(field: &FieldDefinition) -> Option<String> {
    match field.kind {
        FieldKind::FreeText => None,
        FieldKind::SingleChoice => Some(format!("({})", field.options().join("/"))),
        FieldKind::MultiChoice => Some(format!(
            "(comma-separated: {})",
            field.options().join(", ")
        )),
        FieldKind::Rating => Some(format!("(1-{})", field.max.unwrap_or(0))),
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Parses raw input for `field`. Blank input skips optional fields (`Null`).
pub fn parse_answer(field: &FieldDefinition, raw: &str) -> Result<Value, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        if field.required {
            return Err(AnswerParseError::new("This field requires an answer.", None));
        }
        return Ok(Value::Null);
    }

    match field.kind {
        FieldKind::FreeText => Ok(Value::String(raw.to_string())),
        FieldKind::SingleChoice => match_option(field, raw).map(Value::String),
        FieldKind::MultiChoice => {
            let mut selected = Vec::new();
            for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
                let choice = match_option(field, part)?;
                if !selected.contains(&choice) {
                    selected.push(choice);
                }
            }
            Ok(Value::Array(selected.into_iter().map(Value::String).collect()))
        }
        FieldKind::Rating => parse_rating(field, raw),
    }
}

fn match_option(field: &FieldDefinition, raw: &str) -> Result<String, AnswerParseError> {
    let options = field.options();
    if let Some(option) = options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
    {
        return Ok(option.clone());
    }
    if let Ok(position) = raw.parse::<usize>()
        && let Some(option) = position.checked_sub(1).and_then(|index| options.get(index))
    {
        return Ok(option.clone());
    }
    Err(AnswerParseError::new(
        format!("Choose one of: {}.", options.join(", ")),
        Some(format!("allowed values: {}", options.join(", "))),
    ))
}

fn parse_rating(field: &FieldDefinition, raw: &str) -> Result<Value, AnswerParseError> {
    let max = field.max.unwrap_or(0);
    let out_of_range = || {
        AnswerParseError::new(
            format!("Please enter a whole number from 1 to {}.", max),
            Some("expected integer rating".to_string()),
        )
    };
    let rating = raw.parse::<i64>().map_err(|_| out_of_range())?;
    if rating < 1 || rating > max {
        return Err(out_of_range());
    }
    Ok(Value::from(rating))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
