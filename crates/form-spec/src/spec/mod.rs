pub mod field;
pub mod form;

pub use field::{FieldDefinition, FieldKind};
pub use form::{FormSchema, FormStatus};
