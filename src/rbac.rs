//! Role-based access decisions for human-task steps
//!
//! Decision order:
//!
//! 1. `any` non-empty and the actor holds one of its roles: allowed,
//!    `all` is not consulted.
//! 2. `all` non-empty: allowed iff the actor holds every role in it.
//! 3. Otherwise allowed.
//!
//! An unmatched `any` therefore denies nothing on its own; only a failing
//! `all` denies. Keep this asymmetry unless the access policy is redefined.

use std::collections::HashSet;

use crate::ast::{Definition, Rbac, Step};
use crate::error::{FlowError, Result};

/// Decide whether `roles` satisfies `rule`
pub fn is_allowed<S: AsRef<str>>(rule: &Rbac, roles: &[S]) -> bool {
    let held: HashSet<&str> = roles.iter().map(AsRef::as_ref).collect();

    if !rule.any.is_empty() && rule.any.iter().any(|r| held.contains(r.as_str())) {
        return true;
    }

    if !rule.all.is_empty() {
        return rule.all.iter().all(|r| held.contains(r.as_str()));
    }

    true
}

impl Step {
    /// Access check for this step. Steps without a rule (system tasks,
    /// conditions) are open to everyone.
    pub fn is_allowed_for<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        match self.rbac() {
            Some(rule) => is_allowed(rule, roles),
            None => true,
        }
    }
}

impl Definition {
    /// Access check for step `step_id`
    pub fn is_allowed<S: AsRef<str>>(&self, step_id: &str, roles: &[S]) -> Result<bool> {
        let step = self.step(step_id).ok_or_else(|| FlowError::UnknownStep {
            step_id: step_id.to_string(),
        })?;

        let allowed = step.is_allowed_for(roles);
        tracing::debug!(step = %step_id, allowed, "access decision");
        Ok(allowed)
    }
}
