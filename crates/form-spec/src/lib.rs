#![allow(missing_docs)]

pub mod analytics;
pub mod answers;
pub mod authoring;
pub mod condition;
pub mod render;
pub mod session;
pub mod spec;
pub mod store;
pub mod validate;
pub mod visibility;

pub use analytics::{AnalyticsSnapshot, FieldAnalytics, SkippedField, Trends};
pub use answers::{AnswerError, AnswerIssue, AnswerReport, AnswerSet, check_answers};
pub use authoring::{dependency_candidates, move_field, stale_rules};
pub use condition::{Condition, Operator};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use session::{ResponseSession, SessionError};
pub use spec::{FieldDefinition, FieldKind, FormSchema, FormStatus};
pub use store::{
    FormStore, SnapshotFeed, SnapshotListener, StoreError, SubmissionAck, save_validated,
};
pub use validate::{SchemaViolation, Violation, collect_violations, validate};
pub use visibility::{
    Resolution, VisibilityMap, compute_visibility, is_visible, prune_answers, resolve,
};
