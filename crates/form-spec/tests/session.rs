use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::json;

use form_spec::{
    AnalyticsSnapshot, AnswerSet, FieldDefinition, FormSchema, FormStore, ResponseSession,
    SessionError, SnapshotFeed, SnapshotListener, StoreError, SubmissionAck, Violation,
    save_validated,
};

/// Records what it is given; the snapshot only counts responses.
#[derive(Default)]
struct RecordingStore {
    forms: BTreeMap<String, FormSchema>,
    responses: Vec<(String, AnswerSet)>,
    listeners: Vec<(String, Box<dyn SnapshotListener>)>,
}

impl FormStore for RecordingStore {
    fn save(&mut self, schema: FormSchema) -> Result<String, StoreError> {
        let id = schema.id.clone();
        self.forms.insert(id.clone(), schema);
        Ok(id)
    }

    fn load(&self, form_id: &str) -> Result<FormSchema, StoreError> {
        self.forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(form_id.to_string()))
    }

    fn submit(&mut self, form_id: &str, answers: AnswerSet) -> Result<SubmissionAck, StoreError> {
        self.responses.push((form_id.to_string(), answers));
        let ack = SubmissionAck {
            form_id: form_id.to_string(),
            response_id: format!("r{}", self.responses.len()),
            created: 0,
        };
        let snapshot = self.snapshot(form_id)?;
        for (subscribed, listener) in &mut self.listeners {
            if subscribed.as_str() == form_id {
                listener.on_snapshot(&snapshot);
            }
        }
        Ok(ack)
    }

    fn snapshot(&self, form_id: &str) -> Result<AnalyticsSnapshot, StoreError> {
        let mut snapshot = AnalyticsSnapshot::empty(form_id);
        snapshot.count = self
            .responses
            .iter()
            .filter(|(id, _)| id == form_id)
            .count() as u64;
        Ok(snapshot)
    }
}

impl SnapshotFeed for RecordingStore {
    fn subscribe(&mut self, form_id: &str, listener: Box<dyn SnapshotListener>) {
        self.listeners.push((form_id.to_string(), listener));
    }
}

fn feedback_form() -> FormSchema {
    serde_json::from_str(include_str!("../tests/fixtures/feedback_form.json")).expect("fixture")
}

#[test]
fn session_prunes_on_every_change() {
    let mut session = ResponseSession::new(feedback_form());
    assert!(session.is_visible("uses_product"));
    assert!(!session.is_visible("features"));

    session
        .set_answer("uses_product", json!("Yes"))
        .expect("known field");
    session
        .set_answer("features", json!(["Exports"]))
        .expect("known field");
    session
        .set_answer("export_format", json!("PDF"))
        .expect("known field");
    assert!(session.is_visible("export_format"));
    assert_eq!(session.answers().len(), 3);

    let resolution = session
        .set_answer("uses_product", json!("No"))
        .expect("known field");
    assert!(!resolution.is_visible("features"));
    assert!(!resolution.is_visible("export_format"));
    assert_eq!(session.answers().ids().collect::<Vec<_>>(), vec!["uses_product"]);
}

#[test]
fn answers_for_hidden_fields_never_stick() {
    let mut session = ResponseSession::new(feedback_form());
    session
        .set_answer("complaint", json!("ignored"))
        .expect("known field");
    assert!(!session.answers().contains("complaint"));

    session.set_answer("score", json!(1)).expect("known field");
    session
        .set_answer("complaint", json!("too slow"))
        .expect("known field");
    assert!(session.answers().contains("complaint"));

    session.clear_answer("score");
    assert!(!session.answers().contains("complaint"));
}

#[test]
fn null_clears_an_answer() {
    let mut session = ResponseSession::new(feedback_form());
    session.set_answer("score", json!(4)).expect("known field");
    session.set_answer("score", json!(null)).expect("known field");
    assert!(session.answers().is_empty());
}

#[test]
fn unknown_fields_are_rejected() {
    let mut session = ResponseSession::new(feedback_form());
    let err = session.set_answer("nope", json!(1)).expect_err("unknown");
    assert_eq!(
        err,
        SessionError::UnknownField {
            form: "feedback".into(),
            field: "nope".into()
        }
    );
}

#[test]
fn visible_fields_follow_form_order() {
    let raw =
        AnswerSet::from_value(&json!({ "uses_product": "Yes", "score": 5 })).expect("answers");
    let session = ResponseSession::with_answers(feedback_form(), &raw);
    let ids: Vec<&str> = session
        .visible_fields()
        .map(|field| field.id.as_str())
        .collect();
    assert_eq!(ids, vec!["uses_product", "features", "score"]);
}

#[test]
fn submit_sends_only_pruned_answers_and_notifies_listeners() {
    let mut store = RecordingStore::default();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store.subscribe(
        "feedback",
        Box::new(move |snapshot: &AnalyticsSnapshot| sink.borrow_mut().push(snapshot.count)),
    );

    let raw = AnswerSet::from_value(&json!({
        "uses_product": "No",
        "features": ["Exports"],
        "score": 5,
        "complaint": "stale"
    }))
    .expect("answers");
    let mut session = ResponseSession::with_answers(feedback_form(), &raw);
    let ack = session.submit(&mut store).expect("submit");

    assert_eq!(ack.form_id, "feedback");
    assert_eq!(ack.response_id, "r1");
    let (_, submitted) = &store.responses[0];
    assert_eq!(
        submitted,
        &AnswerSet::from_value(&json!({ "uses_product": "No", "score": 5 })).expect("answers")
    );
    assert!(session.answers().is_empty());
    assert_eq!(*seen.borrow(), vec![1]);
}

#[test]
fn drafts_cannot_take_responses() {
    let mut schema = feedback_form();
    schema.status = Default::default();
    let mut store = RecordingStore::default();
    let mut session = ResponseSession::new(schema);
    let err = session.submit(&mut store).expect_err("draft");
    assert!(matches!(err, StoreError::NotPublished(id) if id == "feedback"));
    assert!(store.responses.is_empty());
}

#[test]
fn invalid_schemas_are_not_saved() {
    let mut store = RecordingStore::default();
    let schema = FormSchema::new(
        "broken",
        "Broken",
        vec![
            FieldDefinition::free_text("a", "A"),
            FieldDefinition::free_text("a", "A again"),
        ],
    );
    let err = save_validated(&mut store, schema).expect_err("duplicate ids");
    match err {
        StoreError::Schema(violation) => assert!(matches!(
            violation.reasons[0],
            Violation::DuplicateId { index: 1, .. }
        )),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(store.forms.is_empty());

    let id = save_validated(&mut store, feedback_form()).expect("valid schema");
    assert_eq!(store.load(&id).expect("load").title, "Product feedback");
}
