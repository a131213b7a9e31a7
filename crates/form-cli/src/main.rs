mod builder;
mod wizard;

use builder::{SchemaDraft, write_schema};
use clap::{Parser, Subcommand, ValueEnum};
use component_form::{render_json_ui, render_text};
use form_spec::{
    AnswerReport, AnswerSet, Condition, FieldDefinition, FieldKind, FormSchema, Operator,
    ResponseSession, SchemaViolation, check_answers, resolve,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wizard::{FillPresenter, PromptContext, Verbosity, encode_hex, parse_answer};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "FORMKIT_LOG";

#[derive(Parser)]
#[command(
    name = "formkit",
    author,
    version,
    about = "Conditional form authoring and filling CLI",
    long_about = "Validates form schemas, resolves conditional visibility, \
                  prunes stale answers and runs forms interactively"
)]
struct Cli {
    /// Log debug output to stderr (overridden by FORMKIT_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ViewFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AnswerFormat {
    Json,
    Cbor,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a form schema can be saved.
    Validate {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
    },
    /// Show which fields are visible for a set of answers.
    Visibility {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        #[arg(long, value_enum, default_value_t = ViewFormat::Text)]
        format: ViewFormat,
    },
    /// Print the answers that would be submitted, with hidden answers removed.
    Prune {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        #[arg(long, value_enum, default_value_t = AnswerFormat::Json)]
        format: AnswerFormat,
    },
    /// Check answers against the visible fields (required, types, options, ranges).
    Check {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Fill a form interactively; only visible fields are asked.
    Fill {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file containing initial answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Also print the final answers as JSON.
        #[arg(long)]
        answers_json: bool,
        /// Write the final answers to this file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Build a form schema interactively.
    New {
        /// Where to write the schema JSON.
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the JSON Schema describing form schema documents.
    JsonSchema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Validate { schema } => run_validate(&schema),
        Command::Visibility {
            schema,
            answers,
            format,
        } => run_visibility(&schema, &answers, format),
        Command::Prune {
            schema,
            answers,
            format,
        } => run_prune(&schema, &answers, format),
        Command::Check { schema, answers } => run_check(&schema, &answers),
        Command::Fill {
            schema,
            answers,
            answers_json,
            out,
        } => run_fill(&schema, answers.as_deref(), answers_json, out.as_deref(), cli.verbose),
        Command::New { out, force } => run_new(&out, force),
        Command::JsonSchema => run_json_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn load_schema(path: &Path) -> CliResult<(FormSchema, String)> {
    let contents = fs::read_to_string(path)?;
    let schema: FormSchema = serde_json::from_str(&contents)?;
    debug!(form = %schema.id, fields = schema.fields.len(), "loaded schema");
    Ok((schema, contents))
}

fn load_answers(path: &Path) -> CliResult<AnswerSet> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    Ok(AnswerSet::from_value(&value)?)
}

fn describe_violations(violation: &SchemaViolation) {
    println!("Violations:");
    for reason in &violation.reasons {
        println!("  - {}", reason);
    }
}

fn run_validate(schema_path: &Path) -> CliResult<()> {
    let (schema, _) = load_schema(schema_path)?;
    match schema.validate() {
        Ok(()) => {
            println!("Schema '{}' is valid ({} fields).", schema.id, schema.fields.len());
            Ok(())
        }
        Err(violation) => {
            println!("Schema '{}' is invalid.", schema.id);
            describe_violations(&violation);
            Err("schema validation failed".into())
        }
    }
}

fn run_visibility(schema_path: &Path, answers_path: &Path, format: ViewFormat) -> CliResult<()> {
    let (schema, contents) = load_schema(schema_path)?;
    let answers = load_answers(answers_path)?.to_value().to_string();
    let config_json = json!({ "form_schema_json": contents }).to_string();
    let output = match format {
        ViewFormat::Text => render_text(&schema.id, &config_json, &answers),
        ViewFormat::Json => {
            let raw = render_json_ui(&schema.id, &config_json, &answers);
            let value = parse_component_result(&raw)?;
            serde_json::to_string_pretty(&value)?
        }
    };
    println!("{}", output);
    Ok(())
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_prune(schema_path: &Path, answers_path: &Path, format: AnswerFormat) -> CliResult<()> {
    let (schema, _) = load_schema(schema_path)?;
    let answers = load_answers(answers_path)?;
    let resolution = resolve(&schema.fields, &answers);
    let dropped: Vec<&str> = answers
        .ids()
        .filter(|id| !resolution.answers.contains(id))
        .collect();
    if !dropped.is_empty() {
        info!(dropped = %dropped.join(","), "pruned answers");
    }
    match format {
        AnswerFormat::Json => println!("{}", resolution.answers.to_json_pretty()?),
        AnswerFormat::Cbor => println!("{}", encode_hex(&resolution.answers.to_cbor()?)),
    }
    Ok(())
}

fn describe_report(report: &AnswerReport) {
    if !report.errors.is_empty() {
        println!("Errors:");
        for error in &report.errors {
            println!("  {} - {}", error.path, error.message);
        }
    }
    if !report.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            report.missing_required.join(", ")
        );
    }
    if !report.unknown_fields.is_empty() {
        println!("Unknown answer fields: {}", report.unknown_fields.join(", "));
    }
}

fn run_check(schema_path: &Path, answers_path: &Path) -> CliResult<()> {
    let (schema, _) = load_schema(schema_path)?;
    let answers = load_answers(answers_path)?;
    let report = check_answers(&schema.fields, &answers);
    println!(
        "Answer check: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    describe_report(&report);
    if report.valid {
        Ok(())
    } else {
        Err("answer check failed".into())
    }
}

fn run_fill(
    schema_path: &Path,
    answers_path: Option<&Path>,
    answers_json: bool,
    out: Option<&Path>,
    verbose: bool,
) -> CliResult<()> {
    let (schema, _) = load_schema(schema_path)?;
    if let Err(violation) = schema.validate() {
        describe_violations(&violation);
        return Err("refusing to fill an invalid schema".into());
    }
    let initial = match answers_path {
        Some(path) => load_answers(path)?,
        None => AnswerSet::new(),
    };

    let mut session = ResponseSession::with_answers(schema, &initial);
    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose), answers_json);
    let mut skipped: HashSet<String> = HashSet::new();

    loop {
        presenter.show_header(&session);
        let next = session
            .visible_fields()
            .find(|field| !session.answers().contains(&field.id) && !skipped.contains(&field.id))
            .cloned();
        let Some(field) = next else {
            break;
        };
        presenter.show_status(&session);

        let total = session.visible_fields().count();
        let prompt = PromptContext::new(&field, session.answers().len(), total);
        let value = prompt_field(&prompt, &field, &presenter)?;
        if value.is_null() {
            skipped.insert(field.id.clone());
            continue;
        }

        let before: Vec<String> = session.answers().ids().map(String::from).collect();
        let resolution = session.set_answer(&field.id, value)?;
        let pruned: Vec<String> = before
            .into_iter()
            .filter(|id| !resolution.answers.contains(id))
            .collect();
        presenter.show_pruned(&pruned);
    }

    presenter.show_completion(session.answers());
    if let Some(path) = out {
        fs::write(path, session.answers().to_json_pretty()?)?;
    }
    Ok(())
}

fn prompt_field(
    prompt: &PromptContext,
    field: &FieldDefinition,
    presenter: &FillPresenter,
) -> CliResult<Value> {
    loop {
        presenter.show_prompt(prompt);
        let input = read_input("> ")?;
        if input.trim().eq_ignore_ascii_case("exit") {
            return Err("form filling aborted by user".into());
        }
        match parse_answer(field, &input) {
            Ok(value) => return Ok(value),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Reads one line; end of input is an error so loops cannot spin forever.
fn read_input(prompt: &str) -> CliResult<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Err("input ended before the form was complete".into());
    }
    Ok(line.trim().to_string())
}

fn prompt_line(prompt: &str, default: Option<&str>) -> CliResult<String> {
    let label = match default {
        Some(default_value) => format!("{} [{}]: ", prompt, default_value),
        None => format!("{}: ", prompt),
    };
    let value = read_input(&label)?;
    match default {
        Some(default_value) if value.is_empty() => Ok(default_value.to_string()),
        _ => Ok(value),
    }
}

fn prompt_optional(prompt: &str) -> CliResult<Option<String>> {
    let value = prompt_line(prompt, None)?;
    if value.is_empty() {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn prompt_non_empty(prompt: &str, default: Option<&str>) -> CliResult<String> {
    loop {
        let value = prompt_line(prompt, default)?;
        if !value.is_empty() {
            return Ok(value);
        }
        println!("Value cannot be empty.");
    }
}

fn prompt_bool(prompt: &str, default: bool) -> CliResult<bool> {
    let default_label = if default { "y" } else { "n" };
    loop {
        let value = prompt_line(&format!("{} (y/n)", prompt), Some(default_label))?;
        match value.to_lowercase().as_str() {
            "y" | "yes" | "true" | "1" => return Ok(true),
            "n" | "no" | "false" | "0" => return Ok(false),
            _ => println!("Please answer yes or no."),
        }
    }
}

fn run_new(out: &Path, force: bool) -> CliResult<()> {
    if out.exists() && !force {
        return Err(format!(
            "{} already exists; rerun with --force to overwrite",
            out.display()
        )
        .into());
    }
    println!("Interactive form builder");
    let form_id = prompt_non_empty("Form ID", None)?;
    let title = prompt_non_empty("Form title", None)?;
    let mut draft = SchemaDraft::new(form_id, title);

    loop {
        let Some(id) = prompt_optional("Field ID (blank to finish)")? else {
            break;
        };
        if draft.has_field(&id) {
            println!("Field ID '{}' already used; choose a different identifier.", id);
            continue;
        }
        let label = prompt_non_empty("Field label", Some(&id))?;
        let kind = prompt_field_kind()?;
        let mut field = FieldDefinition::new(id, kind, label);
        field.required = prompt_bool("Required?", false)?;
        match kind {
            FieldKind::SingleChoice | FieldKind::MultiChoice => {
                field.options = Some(prompt_options()?);
            }
            FieldKind::Rating => {
                field.max = Some(prompt_rating_max()?);
            }
            FieldKind::FreeText => {}
        }
        field.visibility_rule = prompt_visibility_rule(&draft)?;

        if let Err(err) = draft.push_field(field) {
            println!("Invalid field: {}. Let's try again.", err);
        }
    }

    let schema = match draft.finish(prompt_bool("Publish now?", false)?) {
        Ok(schema) => schema,
        Err(violation) => {
            describe_violations(&violation);
            return Err("schema was not saved".into());
        }
    };
    write_schema(out, &schema, force)?;
    println!("Saved form '{}' to {}", schema.id, out.display());
    Ok(())
}

fn prompt_field_kind() -> CliResult<FieldKind> {
    loop {
        let value = prompt_line(
            "Field kind (free_text/single_choice/multi_choice/rating)",
            Some("free_text"),
        )?;
        match serde_json::from_value::<FieldKind>(Value::String(value.to_lowercase())) {
            Ok(kind) => return Ok(kind),
            Err(_) => println!("Unknown field kind '{}'.", value),
        }
    }
}

fn prompt_options() -> CliResult<Vec<String>> {
    loop {
        let raw = prompt_non_empty("Options (comma-separated)", None)?;
        let options: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|option| !option.is_empty())
            .map(String::from)
            .collect();
        if !options.is_empty() {
            return Ok(options);
        }
        println!("Provide at least one option.");
    }
}

fn prompt_rating_max() -> CliResult<i64> {
    loop {
        let raw = prompt_line("Rating max", Some("5"))?;
        match raw.parse::<i64>() {
            Ok(max) if max > 0 => return Ok(max),
            _ => println!("Rating max must be a positive whole number."),
        }
    }
}

fn prompt_visibility_rule(draft: &SchemaDraft) -> CliResult<Option<Condition>> {
    let candidates = draft.candidate_ids();
    if candidates.is_empty() || !prompt_bool("Add visibility rule?", false)? {
        return Ok(None);
    }
    println!("Earlier fields: {}", candidates.join(", "));
    let depends_on = loop {
        let value = prompt_non_empty("Depends on", candidates.last().copied())?;
        if candidates.contains(&value.as_str()) {
            break value;
        }
        println!("Choose one of: {}.", candidates.join(", "));
    };
    let operators = Operator::RECOGNIZED.map(|operator| operator.as_str().to_string());
    let operator = loop {
        let value = prompt_line(&format!("Operator ({})", operators.join("/")), Some("equals"))?;
        let operator = Operator::parse(&value);
        if operator.is_recognized() {
            break operator;
        }
        println!("Unknown operator '{}'.", value);
    };
    let comparand = parse_comparand(&prompt_non_empty("Compare against", None)?);
    Ok(Some(Condition::new(depends_on, operator, comparand)))
}

/// Numbers become JSON numbers; anything else stays text.
fn parse_comparand(raw: &str) -> Value {
    if let Ok(number) = raw.parse::<i64>() {
        return Value::from(number);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

fn run_json_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSchema);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::TempDir;

    const FEEDBACK_FORM: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../form-spec/tests/fixtures/feedback_form.json"
    );

    fn formkit() -> Command {
        Command::cargo_bin("formkit").expect("formkit binary")
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn stdout_of(output: &std::process::Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    #[test]
    fn comparand_input_prefers_numbers() {
        assert_eq!(parse_comparand("3"), json!(3));
        assert_eq!(parse_comparand("2.5"), json!(2.5));
        assert_eq!(parse_comparand("Yes"), json!("Yes"));
    }

    #[test]
    fn validate_accepts_fixture_schema() {
        let output = formkit()
            .args(["validate", "--schema", FEEDBACK_FORM])
            .output()
            .expect("run");
        assert!(output.status.success());
        assert!(stdout_of(&output).contains("Schema 'feedback' is valid (5 fields)."));
    }

    #[test]
    fn validate_rejects_forward_dependency() {
        let dir = TempDir::new().expect("temp dir");
        let schema = write_file(
            &dir,
            "form.json",
            r#"{
                "id": "broken",
                "title": "Broken",
                "fields": [
                    {"id": "b", "kind": "free_text", "label": "B",
                     "visibility_rule":
                        {"depends_on": "a", "operator": "equals", "comparand": "x"}},
                    {"id": "a", "kind": "free_text", "label": "A"}
                ]
            }"#,
        );
        let output = formkit()
            .arg("validate")
            .arg("--schema")
            .arg(&schema)
            .output()
            .expect("run");
        assert!(!output.status.success());
        let stdout = stdout_of(&output);
        assert!(stdout.contains("Schema 'broken' is invalid."));
        assert!(stdout.contains("Violations:"));
    }

    #[test]
    fn visibility_lists_hidden_fields() {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_file(&dir, "answers.json", r#"{"uses_product": "No"}"#);
        let output = formkit()
            .args(["visibility", "--schema", FEEDBACK_FORM, "--answers"])
            .arg(&answers)
            .output()
            .expect("run");
        assert!(output.status.success());
        assert!(
            stdout_of(&output).contains("Hidden fields: features, export_format, complaint")
        );
    }

    #[test]
    fn visibility_fails_on_malformed_answers() {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_file(&dir, "bad.json", "{not json");
        for format in ["text", "json"] {
            let output = formkit()
                .args(["visibility", "--schema", FEEDBACK_FORM, "--format", format])
                .arg("--answers")
                .arg(&answers)
                .output()
                .expect("run");
            assert!(!output.status.success(), "format {}", format);
            assert!(!stdout_of(&output).contains("Status:"));
        }
    }

    #[test]
    fn prune_drops_hidden_and_unknown_answers() {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_file(
            &dir,
            "answers.json",
            r#"{
                "uses_product": "No",
                "features": ["Exports"],
                "export_format": "CSV",
                "score": 4,
                "complaint": "slow",
                "bogus": 1
            }"#,
        );
        let output = formkit()
            .args(["prune", "--schema", FEEDBACK_FORM, "--answers"])
            .arg(&answers)
            .output()
            .expect("run");
        assert!(output.status.success());
        let pruned: Value = serde_json::from_str(&stdout_of(&output)).expect("json output");
        assert_eq!(pruned, json!({"uses_product": "No", "score": 4}));
    }

    #[test]
    fn check_fails_on_missing_required_answers() {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_file(&dir, "answers.json", r#"{"uses_product": "Yes"}"#);
        let output = formkit()
            .args(["check", "--schema", FEEDBACK_FORM, "--answers"])
            .arg(&answers)
            .output()
            .expect("run");
        assert!(!output.status.success());
        let stdout = stdout_of(&output);
        assert!(stdout.contains("Answer check: invalid"));
        assert!(stdout.contains("Missing required answers: score"));
    }

    #[test]
    fn fill_prompts_only_visible_fields() {
        let dir = TempDir::new().expect("temp dir");
        let out = dir.path().join("answers.json");
        let stdin = ["yes", "exports", "csv", "2", "too slow"].join("\n") + "\n";
        formkit()
            .args(["fill", "--schema", FEEDBACK_FORM, "--out"])
            .arg(&out)
            .write_stdin(stdin)
            .assert()
            .success();

        let saved: Value =
            serde_json::from_str(&fs::read_to_string(&out).expect("read")).expect("json");
        assert_eq!(
            saved,
            json!({
                "uses_product": "Yes",
                "features": ["Exports"],
                "export_format": "CSV",
                "score": 2,
                "complaint": "too slow"
            })
        );
    }

    #[test]
    fn fill_fails_when_input_ends_early() {
        formkit()
            .args(["fill", "--schema", FEEDBACK_FORM])
            .write_stdin("yes\n")
            .assert()
            .failure();
    }

    #[test]
    fn new_command_writes_rule_on_earlier_field() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let out = workspace.path().join("forms").join("survey.json");
        let answers = [
            "survey",
            "Survey",
            "q1",
            "",
            "single_choice",
            "y",
            "Yes, No",
            "q2",
            "Why?",
            "",
            "",
            "y",
            "",
            "",
            "Yes",
            "",
            "y",
        ];
        let stdin = format!("{}\n", answers.join("\n"));

        formkit()
            .arg("new")
            .arg("--out")
            .arg(&out)
            .write_stdin(stdin)
            .assert()
            .success();

        let schema: FormSchema = serde_json::from_str(&fs::read_to_string(&out)?)?;
        assert!(schema.is_published());
        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.fields[0].options(), ["Yes", "No"]);
        let rule = schema.fields[1]
            .visibility_rule
            .as_ref()
            .expect("rule on q2");
        assert_eq!(rule.depends_on, "q1");
        assert_eq!(rule.operator, Operator::Equals);
        assert_eq!(rule.comparand, json!("Yes"));
        Ok(())
    }

    #[test]
    fn json_schema_describes_form_documents() {
        let output = formkit().arg("json-schema").output().expect("run");
        assert!(output.status.success());
        let schema: Value = serde_json::from_str(&stdout_of(&output)).expect("json output");
        assert_eq!(schema["title"], json!("FormSchema"));
    }
}
