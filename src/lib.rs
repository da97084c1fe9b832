//! flowdef - workflow definition language
//!
//! ```text
//! raw bytes ──► parser ──► Definition ──► validator ──► DefectReport
//!
//! (Definition, step id, payload) ──► submission ──► Accepted | Rejected
//! (Rbac, roles)                  ──► rbac       ──► allowed | denied
//! ```
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`ast`] | `Definition`, `Step`, `StepKind`, `Rbac`, `Hook` |
//! | [`parser`] | JSON/YAML decoding and the inverse serializers |
//! | [`validator`] | Aggregated structural and semantic checks |
//! | [`submission`] | Form payload validation against JSON Schema |
//! | [`rbac`] | Access decisions for human-task steps |
//! | [`config`] | Owned configuration store and secret resolution |
//! | [`error`] | Error types with codes and fix suggestions |

pub mod ast;
pub mod config;
pub mod error;
pub mod parser;
pub mod rbac;
pub mod submission;
pub mod validator;

pub use ast::{
    Condition, Definition, FormSchema, Hook, HumanTask, Rbac, Step, StepKind, StepType,
};
pub use config::{ConfigStore, FlowConfig};
pub use error::{FixSuggestion, FlowError, Result};
pub use parser::{parse, parse_with, Format};
pub use rbac::is_allowed;
pub use submission::{
    validate_submission, FormValidator, SubmissionOutcome, SubmissionViolation,
};
pub use validator::{validate, Defect, DefectKind, DefectReport};
