//! Workflow definition - the top-level document

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::step::Step;

/// A form is a JSON Schema document (the schema, not submitted data)
pub type FormSchema = serde_json::Map<String, Value>;

/// A complete workflow description.
///
/// Maps are ordered by key, so validation output and serialization are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Unique identifier within a deployment
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub version: String,

    /// Secret name -> value. Empty values may be filled from configuration,
    /// see [`Definition::with_resolved_secrets`].
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub secrets: BTreeMap<String, String>,

    /// Shared data available to every step as `{{name}}`
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub variables: BTreeMap<String, Value>,

    /// Form name -> JSON Schema
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub forms: BTreeMap<String, FormSchema>,

    /// Step id -> step
    #[serde(default, deserialize_with = "null_as_default")]
    pub steps: BTreeMap<String, Step>,
}

impl Definition {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_step(mut self, id: impl Into<String>, step: Step) -> Self {
        self.steps.insert(id.into(), step);
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, schema: FormSchema) -> Self {
        self.forms.insert(name.into(), schema);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.get(id)
    }

    pub fn form(&self, name: &str) -> Option<&FormSchema> {
        self.forms.get(name)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }
}

/// Treats an explicit `null` like an absent field
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
