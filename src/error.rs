//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - FLOW-000-009: Input/output errors (format, serialization, IO)
//! - FLOW-010-019: Definition validation errors
//! - FLOW-020-029: Configuration errors (broken step/form references at use time)
//! - FLOW-030-039: Runtime configuration errors

use thiserror::Error;

use crate::validator::DefectReport;

pub type Result<T> = std::result::Result<T, FlowError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum FlowError {
    // ═══════════════════════════════════════════
    // INPUT/OUTPUT ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[FLOW-001] Invalid definition format: {details}")]
    Format { details: String },

    #[error("[FLOW-002] Failed to serialize definition: {details}")]
    Serialize { details: String },

    #[error("[FLOW-003] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[FLOW-004] Invalid submission payload: {details}")]
    Payload { details: String },

    // ═══════════════════════════════════════════
    // VALIDATION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[FLOW-010] Definition is invalid: {report}")]
    InvalidDefinition { report: DefectReport },

    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[FLOW-020] Step '{step_id}' is not defined")]
    UnknownStep { step_id: String },

    #[error("[FLOW-021] Step '{step_id}' uses form '{form}' which is not defined")]
    FormNotDefined { step_id: String, form: String },

    #[error("[FLOW-022] Form '{form}' has an invalid schema: {reason}")]
    InvalidFormSchema { form: String, reason: String },

    // ═══════════════════════════════════════════
    // RUNTIME CONFIG ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[FLOW-030] Configuration error: {reason}")]
    ConfigError { reason: String },
}

impl FlowError {
    /// Stable error code (e.g. "FLOW-001")
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::Format { .. } => "FLOW-001",
            FlowError::Serialize { .. } => "FLOW-002",
            FlowError::Io(_) => "FLOW-003",
            FlowError::Payload { .. } => "FLOW-004",
            FlowError::InvalidDefinition { .. } => "FLOW-010",
            FlowError::UnknownStep { .. } => "FLOW-020",
            FlowError::FormNotDefined { .. } => "FLOW-021",
            FlowError::InvalidFormSchema { .. } => "FLOW-022",
            FlowError::ConfigError { .. } => "FLOW-030",
        }
    }

    /// True when the error means the workflow itself is misconfigured,
    /// as opposed to the caller having supplied bad data.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            FlowError::UnknownStep { .. }
                | FlowError::FormNotDefined { .. }
                | FlowError::InvalidFormSchema { .. }
        )
    }
}

impl FixSuggestion for FlowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FlowError::Format { .. } => {
                Some("Check syntax and field types (e.g. step 'type' must be a string)")
            }
            FlowError::Serialize { .. } => None,
            FlowError::Io(_) => Some("Check file path and permissions"),
            FlowError::Payload { .. } => {
                Some("Pass the payload as a JSON document, inline or as @path/to/file.json")
            }
            FlowError::InvalidDefinition { .. } => Some("Fix every defect listed above"),
            FlowError::UnknownStep { .. } => Some("Verify the step id exists under 'steps'"),
            FlowError::FormNotDefined { .. } => {
                Some("Declare the form under 'forms' or fix the step's 'form' name")
            }
            FlowError::InvalidFormSchema { .. } => {
                Some("Fix the form's JSON Schema document (see 'flowdef validate')")
            }
            FlowError::ConfigError { .. } => Some("Check config.yaml syntax and permissions"),
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Format {
            details: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(err: serde_yaml::Error) -> Self {
        FlowError::Format {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_code_and_display() {
        let err = FlowError::Format {
            details: "expected value at line 1".to_string(),
        };
        assert_eq!(err.code(), "FLOW-001");
        assert!(err.to_string().contains("[FLOW-001]"));
        assert!(err.to_string().contains("expected value"));
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn test_configuration_errors_are_flagged() {
        let unknown = FlowError::UnknownStep {
            step_id: "s9".to_string(),
        };
        let missing = FlowError::FormNotDefined {
            step_id: "s1".to_string(),
            form: "f1".to_string(),
        };
        let broken = FlowError::InvalidFormSchema {
            form: "f1".to_string(),
            reason: "bad type".to_string(),
        };
        assert!(unknown.is_configuration_error());
        assert!(missing.is_configuration_error());
        assert!(broken.is_configuration_error());
        assert!(missing.to_string().contains("'f1'"));
    }

    #[test]
    fn test_format_error_is_not_configuration_error() {
        let err = FlowError::Format {
            details: "oops".to_string(),
        };
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_json_error_converts_to_format() {
        let err: FlowError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, FlowError::Format { .. }));
    }

    #[test]
    fn test_payload_error_is_distinct_from_format() {
        let err = FlowError::Payload {
            details: "expected value at line 1 column 1".to_string(),
        };
        assert_eq!(err.code(), "FLOW-004");
        assert!(err.to_string().contains("payload"));
        assert!(!err.to_string().contains("definition"));
        assert!(!err.is_configuration_error());
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn test_config_error_fix_suggestion() {
        let err = FlowError::ConfigError {
            reason: "bad yaml".to_string(),
        };
        assert_eq!(err.code(), "FLOW-030");
        assert!(err.fix_suggestion().unwrap().contains("config.yaml"));
    }
}
