//! Step types - one node of the workflow graph
//!
//! A step is exactly one of three variants, selected by its `type` tag:
//! - `humanTask`: external input against a named form, gated by an RBAC rule
//! - `systemTask`: performed by the system, no extra fields
//! - `condition`: picks the next step through a branch expression
//!
//! On the wire every variant shares one flat record (`StepRaw`). In Rust the
//! variant is a closed enum so inactive fields cannot be read.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::definition::null_as_default;

/// The three step type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepType {
    HumanTask,
    SystemTask,
    Condition,
}

impl StepType {
    pub const ALL: [StepType; 3] = [
        StepType::HumanTask,
        StepType::SystemTask,
        StepType::Condition,
    ];

    /// Tag as written in definition files
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::HumanTask => "humanTask",
            StepType::SystemTask => "systemTask",
            StepType::Condition => "condition",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Script attached before or after a step runs.
///
/// Placeholders like `{{name}}` or `{{form.field}}` are left untouched here;
/// an external evaluator interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default)]
    pub script: String,
}

impl Hook {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

/// Role-based access rule of a human task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rbac {
    /// Holding any one of these roles grants access
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub any: BTreeSet<String>,

    /// Every one of these roles is required
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeSet::is_empty"
    )]
    pub all: BTreeSet<String>,
}

impl Rbac {
    pub fn new<A, B>(any: A, all: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            any: any.into_iter().map(Into::into).collect(),
            all: all.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty()
    }
}

/// Payload of a `humanTask` step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HumanTask {
    /// Name of an entry in `Definition::forms` (empty = no form)
    pub form: String,
    pub rbac: Rbac,
}

impl HumanTask {
    pub fn new(form: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            rbac: Rbac::default(),
        }
    }

    pub fn with_rbac(mut self, rbac: Rbac) -> Self {
        self.rbac = rbac;
        self
    }
}

/// Payload of a `condition` step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    pub expr: String,
    /// Step taken when `expr` is true
    pub if_step: String,
    /// Step taken when `expr` is false
    pub else_step: String,
}

/// Type tag that matched none of the known step types.
///
/// Only produced by parsing, so a model value can never disguise a known
/// tag as unrecognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedTag(String);

impl UnrecognizedTag {
    /// Returns `None` when `tag` is one of the known step types.
    pub fn new(tag: impl Into<String>) -> Option<Self> {
        let tag = tag.into();
        match StepType::from_tag(&tag) {
            Some(_) => None,
            None => Some(Self(tag)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Variant payload of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    HumanTask(HumanTask),
    SystemTask,
    Condition(Condition),
    /// Empty or unknown `type`; reported by the validator
    Unrecognized(UnrecognizedTag),
}

impl StepKind {
    pub fn step_type(&self) -> Option<StepType> {
        match self {
            StepKind::HumanTask(_) => Some(StepType::HumanTask),
            StepKind::SystemTask => Some(StepType::SystemTask),
            StepKind::Condition(_) => Some(StepType::Condition),
            StepKind::Unrecognized(_) => None,
        }
    }

    /// Raw type tag (known or not)
    pub fn tag(&self) -> &str {
        match self {
            StepKind::Unrecognized(tag) => tag.as_str(),
            known => known.step_type().map(|t| t.as_str()).unwrap_or_default(),
        }
    }
}

/// A single step in the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StepRaw", into = "StepRaw")]
pub struct Step {
    /// Display name; when absent the step is named after its type
    pub label: Option<String>,
    pub description: Option<String>,
    pub kind: StepKind,
    /// Id of the next step (empty = terminal)
    pub next: String,
    pub before: Option<Hook>,
    pub after: Option<Hook>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            label: None,
            description: None,
            kind,
            next: String::new(),
            before: None,
            after: None,
        }
    }

    pub fn human_task(task: HumanTask) -> Self {
        Self::new(StepKind::HumanTask(task))
    }

    pub fn system_task() -> Self {
        Self::new(StepKind::SystemTask)
    }

    pub fn condition(
        expr: impl Into<String>,
        if_step: impl Into<String>,
        else_step: impl Into<String>,
    ) -> Self {
        Self::new(StepKind::Condition(Condition {
            expr: expr.into(),
            if_step: if_step.into(),
            else_step: else_step.into(),
        }))
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = next.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_before(mut self, hook: Hook) -> Self {
        self.before = Some(hook);
        self
    }

    pub fn with_after(mut self, hook: Hook) -> Self {
        self.after = Some(hook);
        self
    }

    pub fn step_type(&self) -> Option<StepType> {
        self.kind.step_type()
    }

    /// Wire tag of the step, as written in the `type` field
    pub fn kind_tag(&self) -> &str {
        self.kind.tag()
    }

    /// Form name of a human task, if it declares one
    pub fn form(&self) -> Option<&str> {
        match &self.kind {
            StepKind::HumanTask(task) if !task.form.is_empty() => Some(&task.form),
            _ => None,
        }
    }

    /// Access rule of a human task
    pub fn rbac(&self) -> Option<&Rbac> {
        match &self.kind {
            StepKind::HumanTask(task) => Some(&task.rbac),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_empty()
    }

    /// Label, or the type tag when no label is set
    pub fn display_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label,
            _ => self.kind_tag(),
        }
    }
}

/// Flat wire shape shared by every step type
#[derive(Debug, Default, Serialize, Deserialize)]
struct StepRaw {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, rename = "type")]
    step_type: String,

    // humanTask
    #[serde(default, skip_serializing_if = "Option::is_none")]
    form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rbac: Option<Rbac>,

    // condition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expr: Option<String>,
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    if_step: Option<String>,
    #[serde(default, rename = "else", skip_serializing_if = "Option::is_none")]
    else_step: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    next: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    before: Option<Hook>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after: Option<Hook>,
}

impl From<StepRaw> for Step {
    fn from(raw: StepRaw) -> Self {
        // Fields of inactive variants are dropped here
        let kind = match StepType::from_tag(&raw.step_type) {
            Some(StepType::HumanTask) => StepKind::HumanTask(HumanTask {
                form: raw.form.unwrap_or_default(),
                rbac: raw.rbac.unwrap_or_default(),
            }),
            Some(StepType::SystemTask) => StepKind::SystemTask,
            Some(StepType::Condition) => StepKind::Condition(Condition {
                expr: raw.expr.unwrap_or_default(),
                if_step: raw.if_step.unwrap_or_default(),
                else_step: raw.else_step.unwrap_or_default(),
            }),
            None => StepKind::Unrecognized(UnrecognizedTag(raw.step_type)),
        };

        Step {
            label: raw.label,
            description: raw.description,
            kind,
            next: raw.next,
            before: raw.before,
            after: raw.after,
        }
    }
}

impl From<Step> for StepRaw {
    fn from(step: Step) -> Self {
        let non_empty = |s: String| (!s.is_empty()).then_some(s);

        let mut raw = StepRaw {
            label: step.label,
            description: step.description,
            step_type: step.kind.tag().to_string(),
            next: step.next,
            before: step.before,
            after: step.after,
            ..StepRaw::default()
        };

        match step.kind {
            StepKind::HumanTask(task) => {
                raw.form = non_empty(task.form);
                raw.rbac = (!task.rbac.is_empty()).then_some(task.rbac);
            }
            StepKind::Condition(cond) => {
                raw.expr = non_empty(cond.expr);
                raw.if_step = non_empty(cond.if_step);
                raw.else_step = non_empty(cond.else_step);
            }
            StepKind::SystemTask | StepKind::Unrecognized(_) => {}
        }

        raw
    }
}
