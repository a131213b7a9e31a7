use std::{fs, io, path::Path};

use form_spec::{
    Condition, FieldDefinition, FormSchema, FormStatus, SchemaViolation, dependency_candidates,
};

/// A form being assembled field by field.
#[derive(Debug, Clone)]
pub struct SchemaDraft {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDefinition>,
}

impl SchemaDraft {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn has_field(&self, id: &str) -> bool {
        self.fields.iter().any(|field| field.id == id)
    }

    /// Ids a rule on the next appended field may depend on.
    pub fn candidate_ids(&self) -> Vec<&str> {
        dependency_candidates(&self.fields, self.fields.len())
            .iter()
            .map(|field| field.id.as_str())
            .collect()
    }

    /// Appends `field`, refusing rules that point outside the candidates.
    pub fn push_field(&mut self, field: FieldDefinition) -> Result<(), String> {
        if self.has_field(&field.id) {
            return Err(format!("field id '{}' already used", field.id));
        }
        if let Some(Condition { depends_on, .. }) = &field.visibility_rule
            && !self.candidate_ids().contains(&depends_on.as_str())
        {
            return Err(format!(
                "'{}' is not an earlier field; choose one of: {}",
                depends_on,
                self.candidate_ids().join(", ")
            ));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Runs the pre-save gate and produces the schema.
    pub fn finish(self, publish: bool) -> Result<FormSchema, SchemaViolation> {
        let schema = FormSchema {
            id: self.id,
            title: self.title,
            status: if publish {
                FormStatus::Published
            } else {
                FormStatus::Draft
            },
            fields: self.fields,
        };
        schema.validate()?;
        Ok(schema)
    }
}

pub fn write_schema(path: &Path, schema: &FormSchema, force: bool) -> io::Result<()> {
    if path.exists() && !force {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "{} already exists; rerun with --force to overwrite",
                path.display()
            ),
        ));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut contents = serde_json::to_string_pretty(schema).map_err(io::Error::other)?;
    contents.push('\n');
    fs::write(path, contents)
}
