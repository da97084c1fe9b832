//! AST Module - typed workflow definitions
//!
//! - `definition`: Definition, FormSchema
//! - `step`: Step, StepKind, HumanTask, Condition, Hook, Rbac
//!
//! These types are the static structure of a definition. Parsing lives in
//! `parser`, checks in `validator`.

mod definition;
mod step;

pub use definition::{Definition, FormSchema};
pub use step::{Condition, Hook, HumanTask, Rbac, Step, StepKind, StepType, UnrecognizedTag};
