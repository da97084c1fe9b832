//! Form Submission Validation
//!
//! Checks data submitted to a human-task step against the JSON Schema of
//! the form that step declares.
//!
//! ## Outcomes
//!
//! - `Ok(Accepted)`: payload satisfies the schema, or the step has no form
//! - `Ok(Rejected(violations))`: one violation per failed schema rule
//! - `Err(..)`: the definition itself is broken (unknown step, undeclared
//!   form, uncompilable schema), distinct from bad caller data
//!
//! [`validate_submission`] compiles the schema on every call.
//! [`FormValidator`] caches compiled schemas keyed by
//! (definition id, definition version, form name).

use std::sync::Arc;

use dashmap::DashMap;
use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde::Serialize;
use serde_json::Value;

use crate::ast::{Definition, FormSchema};
use crate::error::{FlowError, Result};

/// One violated schema rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionViolation {
    /// JSON pointer to the offending value (e.g. "/amount")
    pub path: String,
    /// Schema keyword that failed (e.g. "required", "type")
    pub constraint: String,
    /// Human-readable message
    pub message: String,
}

/// Result of checking a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Rejected(Vec<SubmissionViolation>),
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted)
    }

    pub fn violations(&self) -> &[SubmissionViolation] {
        match self {
            SubmissionOutcome::Accepted => &[],
            SubmissionOutcome::Rejected(violations) => violations,
        }
    }
}

/// Compile a form document into a JSON Schema validator
pub fn compile_form(name: &str, schema: &FormSchema) -> Result<Validator> {
    Validator::new(&Value::Object(schema.clone())).map_err(|e| FlowError::InvalidFormSchema {
        form: name.to_string(),
        reason: e.to_string(),
    })
}

/// Validate `payload` against the form of step `step_id`
pub fn validate_submission(
    definition: &Definition,
    step_id: &str,
    payload: &Value,
) -> Result<SubmissionOutcome> {
    let Some((form, schema)) = resolve_form(definition, step_id)? else {
        return Ok(SubmissionOutcome::Accepted);
    };

    let validator = compile_form(form, schema)?;
    Ok(check(&validator, payload))
}

/// Step -> (form name, schema). `None` when the step takes no form.
fn resolve_form<'a>(
    definition: &'a Definition,
    step_id: &str,
) -> Result<Option<(&'a str, &'a FormSchema)>> {
    let step = definition.step(step_id).ok_or_else(|| FlowError::UnknownStep {
        step_id: step_id.to_string(),
    })?;

    let Some(form) = step.form() else {
        tracing::debug!(step = %step_id, "step has no form, submission accepted");
        return Ok(None);
    };

    let schema = definition
        .form(form)
        .ok_or_else(|| FlowError::FormNotDefined {
            step_id: step_id.to_string(),
            form: form.to_string(),
        })?;

    Ok(Some((form, schema)))
}

fn check(validator: &Validator, payload: &Value) -> SubmissionOutcome {
    let violations: Vec<SubmissionViolation> = validator
        .iter_errors(payload)
        .map(|error| to_violation(&error))
        .collect();

    if violations.is_empty() {
        SubmissionOutcome::Accepted
    } else {
        tracing::debug!(count = violations.len(), "submission rejected");
        SubmissionOutcome::Rejected(violations)
    }
}

fn to_violation(error: &ValidationError) -> SubmissionViolation {
    let instance_path = error.instance_path.to_string();

    // A missing property has no instance of its own; point at where it
    // should have been.
    let path = match &error.kind {
        ValidationErrorKind::Required { property } => match property.as_str() {
            Some(name) => format!("{}/{}", instance_path, escape_pointer_token(name)),
            None => instance_path,
        },
        _ => instance_path,
    };

    SubmissionViolation {
        path,
        constraint: keyword(&error.schema_path.to_string()),
        message: error.to_string(),
    }
}

/// Last segment of a schema path ("/properties/amount/type" -> "type")
fn keyword(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|segment| !segment.is_empty() && segment.parse::<usize>().is_err())
        .unwrap_or("schema")
        .to_string()
}

/// RFC 6901 token escaping: `~` -> `~0`, `/` -> `~1`
fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Cache key: (definition id, definition version, form name)
type CacheKey = (String, String, String);

/// Statistics about the schema cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub schemas: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Submission validator with a thread-safe compiled-schema cache
///
/// Schemas are cached under (definition id, version, form name). A
/// definition with an empty id or version has no stable identity, so its
/// schemas are compiled on every call and never cached.
#[derive(Default)]
pub struct FormValidator {
    cache: DashMap<CacheKey, Arc<Validator>>,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl FormValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same contract as [`validate_submission`], reusing compiled schemas
    pub fn validate(
        &self,
        definition: &Definition,
        step_id: &str,
        payload: &Value,
    ) -> Result<SubmissionOutcome> {
        let Some((form, schema)) = resolve_form(definition, step_id)? else {
            return Ok(SubmissionOutcome::Accepted);
        };

        let validator = self.compiled(definition, form, schema)?;
        Ok(check(&validator, payload))
    }

    fn compiled(
        &self,
        definition: &Definition,
        form: &str,
        schema: &FormSchema,
    ) -> Result<Arc<Validator>> {
        use std::sync::atomic::Ordering;

        if definition.id.is_empty() || definition.version.is_empty() {
            tracing::trace!(form = %form, "definition has no identity, schema not cached");
            return Ok(Arc::new(compile_form(form, schema)?));
        }

        let key = (
            definition.id.clone(),
            definition.version.clone(),
            form.to_string(),
        );

        if let Some(cached) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(form = %form, "schema cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(form = %form, version = %definition.version, "schema cache miss");

        let validator = Arc::new(compile_form(form, schema)?);
        self.cache.insert(key, Arc::clone(&validator));
        Ok(validator)
    }

    /// Drop every compiled schema
    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering;

        CacheStats {
            schemas: self.cache.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
