//! Definition Validator
//!
//! Runs every structural and semantic check over a parsed [`Definition`]
//! and aggregates the results into a [`DefectReport`]:
//!
//! 1. Header - `id`, `version` and at least one step
//! 2. Forms - every form document compiles as a JSON Schema
//! 3. Steps - non-empty ids, known type tags, human-task form references
//!
//! Checks never short-circuit: one call reports every defect. An empty
//! report means the definition is valid.
//!
//! `next`, `if` and `else` targets are not checked against `steps`, and
//! condition steps get no checks beyond their type tag.

use std::fmt;

use serde::Serialize;

use crate::ast::{Definition, FormSchema, StepKind, StepType};
use crate::error::{FlowError, Result};
use crate::submission::compile_form;

/// Entity named by header defects when the definition has no id
pub const DEFINITION_ENTITY: &str = "<definition>";

/// Category of a defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectKind {
    /// Missing required field, empty step set, bad step id or type tag
    Structural,
    /// A step references a form that does not exist
    Reference,
    /// A form's own schema document is malformed
    Schema,
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefectKind::Structural => write!(f, "StructuralError"),
            DefectKind::Reference => write!(f, "ReferenceError"),
            DefectKind::Schema => write!(f, "SchemaError"),
        }
    }
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Defect {
    pub kind: DefectKind,
    pub message: String,
    /// Definition id, form name or step id
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Defect {
    pub fn new(kind: DefectKind, entity_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            entity_id: entity_id.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.kind, self.entity_id, self.message)
    }
}

/// Ordered, possibly empty collection of defects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DefectReport {
    defects: Vec<Defect>,
}

impl DefectReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, defect: Defect) {
        tracing::trace!(kind = %defect.kind, entity = %defect.entity_id, "{}", defect.message);
        self.defects.push(defect);
    }

    pub fn is_valid(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.defects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Defect> {
        self.defects.iter()
    }

    pub fn of_kind(&self, kind: DefectKind) -> impl Iterator<Item = &Defect> {
        self.defects.iter().filter(move |d| d.kind == kind)
    }

    pub fn for_entity<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = &'a Defect> {
        self.defects.iter().filter(move |d| d.entity_id == entity_id)
    }

    /// `Ok(())` when valid, otherwise the whole report as an error
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FlowError::InvalidDefinition { report: self })
        }
    }
}

impl fmt::Display for DefectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.defects.as_slice() {
            [] => write!(f, "no defects"),
            [one] => write!(f, "{}", one),
            many => {
                write!(f, "{} defects: ", many.len())?;
                for (i, defect) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", defect)?;
                }
                Ok(())
            }
        }
    }
}

impl IntoIterator for DefectReport {
    type Item = Defect;
    type IntoIter = std::vec::IntoIter<Defect>;

    fn into_iter(self) -> Self::IntoIter {
        self.defects.into_iter()
    }
}

impl<'a> IntoIterator for &'a DefectReport {
    type Item = &'a Defect;
    type IntoIter = std::slice::Iter<'a, Defect>;

    fn into_iter(self) -> Self::IntoIter {
        self.defects.iter()
    }
}

impl Extend<Defect> for DefectReport {
    fn extend<I: IntoIterator<Item = Defect>>(&mut self, iter: I) {
        for defect in iter {
            self.push(defect);
        }
    }
}

/// Validate a definition through every check
pub fn validate(definition: &Definition) -> DefectReport {
    let mut report = DefectReport::new();

    report.extend(validate_header(definition));
    report.extend(validate_forms(definition));
    report.extend(validate_steps(definition));

    tracing::debug!(
        id = %definition.id,
        defects = report.len(),
        "definition validated"
    );
    report
}

/// Header: id, version, non-empty step set
pub fn validate_header(definition: &Definition) -> Vec<Defect> {
    let mut defects = Vec::new();
    let entity = if definition.id.is_empty() {
        DEFINITION_ENTITY
    } else {
        definition.id.as_str()
    };

    if definition.id.is_empty() {
        defects.push(
            Defect::new(DefectKind::Structural, entity, "id required")
                .with_suggestion("Add a top-level 'id' field"),
        );
    }

    if definition.version.is_empty() {
        defects.push(
            Defect::new(DefectKind::Structural, entity, "version required")
                .with_suggestion("Add a top-level 'version' field, e.g. \"1.0\""),
        );
    }

    if definition.steps.is_empty() {
        defects.push(
            Defect::new(DefectKind::Structural, entity, "no steps defined")
                .with_suggestion("Define at least one step under 'steps'"),
        );
    }

    defects
}

/// Forms: each document must compile as a JSON Schema
pub fn validate_forms(definition: &Definition) -> Vec<Defect> {
    definition
        .forms
        .iter()
        .filter_map(|(name, schema)| validate_form(name, schema))
        .collect()
}

fn validate_form(name: &str, schema: &FormSchema) -> Option<Defect> {
    match compile_form(name, schema) {
        Ok(_) => None,
        Err(FlowError::InvalidFormSchema { reason, .. }) => Some(Defect::new(
            DefectKind::Schema,
            name,
            format!("form '{}' is not a valid JSON Schema: {}", name, reason),
        )),
        Err(other) => Some(Defect::new(DefectKind::Schema, name, other.to_string())),
    }
}

/// Steps: ids, type tags, then type-specific checks
pub fn validate_steps(definition: &Definition) -> Vec<Defect> {
    let mut defects = Vec::new();

    for (step_id, step) in &definition.steps {
        if step_id.is_empty() {
            let name = step.display_name();
            defects.push(
                Defect::new(DefectKind::Structural, step_id.as_str(), "all steps must have an id")
                    .with_suggestion(format!("Give the '{}' step a non-empty key", name)),
            );
        }

        match &step.kind {
            StepKind::HumanTask(task) => {
                if let Some(defect) = validate_human_task(definition, step_id, &task.form) {
                    defects.push(defect);
                }
            }
            StepKind::SystemTask | StepKind::Condition(_) => {}
            StepKind::Unrecognized(tag) => defects.push(unrecognized_type(step_id, tag.as_str())),
        }
    }

    defects
}

fn validate_human_task(definition: &Definition, step_id: &str, form: &str) -> Option<Defect> {
    if form.is_empty() {
        return Some(
            Defect::new(
                DefectKind::Reference,
                step_id,
                format!("human task step '{}' has no form", step_id),
            )
            .with_suggestion(available_forms(definition)),
        );
    }

    if definition.form(form).is_none() {
        return Some(
            Defect::new(
                DefectKind::Reference,
                step_id,
                format!(
                    "human task step '{}' references form '{}' which is not defined",
                    step_id, form
                ),
            )
            .with_suggestion(available_forms(definition)),
        );
    }

    None
}

fn unrecognized_type(step_id: &str, tag: &str) -> Defect {
    if tag.is_empty() {
        return Defect::new(
            DefectKind::Structural,
            step_id,
            format!("step '{}' has no type", step_id),
        )
        .with_suggestion(allowed_types_hint());
    }

    let defect = Defect::new(
        DefectKind::Structural,
        step_id,
        format!("step '{}' has unknown type '{}'", step_id, tag),
    );

    match find_similar_type(tag) {
        Some(similar) => defect.with_suggestion(format!("Did you mean: {}?", similar)),
        None => defect.with_suggestion(allowed_types_hint()),
    }
}

/// Case-insensitive "did you mean?" lookup among the known step types
fn find_similar_type(tag: &str) -> Option<StepType> {
    let lower = tag.to_lowercase();
    StepType::ALL.into_iter().find(|t| {
        let known = t.as_str().to_lowercase();
        known == lower || (lower.len() >= 4 && (known.contains(&lower) || lower.contains(&known)))
    })
}

fn allowed_types_hint() -> String {
    let tags: Vec<&str> = StepType::ALL.iter().map(|t| t.as_str()).collect();
    format!("Use one of: {}", tags.join(", "))
}

fn available_forms(definition: &Definition) -> String {
    if definition.forms.is_empty() {
        return "No forms are defined; add one under 'forms'".to_string();
    }
    let names: Vec<&str> = definition.forms.keys().map(String::as_str).collect();
    format!("Available forms: {}", names.join(", "))
}
