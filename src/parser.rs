//! Definition parsing and serialization
//!
//! Purely syntactic: bytes in, [`Definition`] out. No semantic checks happen
//! here (see [`crate::validator`]). Every serializer is the inverse of the
//! matching parser, so `parse_with(serialize(d, f), f) == d`.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::ast::Definition;
use crate::error::{FlowError, Result};

/// Structured-text encodings a definition may be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    /// Guess the format from a file extension (`.json`, `.yaml`, `.yml`)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(FlowError::Format {
                details: format!("unknown format '{}' (expected json or yaml)", other),
            }),
        }
    }
}

/// Decodes raw bytes into a definition
pub trait DefinitionParser {
    fn format(&self) -> Format;

    fn parse(&self, raw: &[u8]) -> Result<Definition>;
}

pub struct JsonParser;

impl DefinitionParser for JsonParser {
    fn format(&self) -> Format {
        Format::Json
    }

    fn parse(&self, raw: &[u8]) -> Result<Definition> {
        Ok(serde_json::from_slice(raw)?)
    }
}

pub struct YamlParser;

impl DefinitionParser for YamlParser {
    fn format(&self) -> Format {
        Format::Yaml
    }

    fn parse(&self, raw: &[u8]) -> Result<Definition> {
        Ok(serde_yaml::from_slice(raw)?)
    }
}

pub fn parser_for(format: Format) -> &'static dyn DefinitionParser {
    match format {
        Format::Json => &JsonParser,
        Format::Yaml => &YamlParser,
    }
}

/// Parse a JSON definition
pub fn parse(raw: &[u8]) -> Result<Definition> {
    parse_with(raw, Format::Json)
}

pub fn parse_with(raw: &[u8], format: Format) -> Result<Definition> {
    tracing::debug!(bytes = raw.len(), %format, "parsing definition");

    let definition = parser_for(format).parse(raw).map_err(|e| {
        tracing::debug!(error = %e, %format, "definition rejected by parser");
        e
    })?;

    tracing::trace!(
        id = %definition.id,
        steps = definition.steps.len(),
        forms = definition.forms.len(),
        "definition parsed"
    );
    Ok(definition)
}

/// Read and parse a definition file; the format comes from the extension
/// and defaults to YAML.
pub fn load(path: &Path) -> Result<Definition> {
    let format = Format::from_path(path).unwrap_or(Format::Yaml);
    let raw = std::fs::read(path)?;
    parse_with(&raw, format)
}

pub fn serialize(definition: &Definition, format: Format) -> Result<String> {
    match format {
        Format::Json => to_json_pretty(definition),
        Format::Yaml => to_yaml(definition),
    }
}

pub fn to_json(definition: &Definition) -> Result<String> {
    serde_json::to_string(definition).map_err(|e| FlowError::Serialize {
        details: e.to_string(),
    })
}

pub fn to_json_pretty(definition: &Definition) -> Result<String> {
    serde_json::to_string_pretty(definition).map_err(|e| FlowError::Serialize {
        details: e.to_string(),
    })
}

pub fn to_yaml(definition: &Definition) -> Result<String> {
    serde_yaml::to_string(definition).map_err(|e| FlowError::Serialize {
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FormSchema, Hook, HumanTask, Rbac, Step, StepKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const EXPENSE_YAML: &str = r#"
id: expense
version: "1.0"
variables:
  threshold: 100
forms:
  claim:
    type: object
    required: [amount]
    properties:
      amount: { type: number }
steps:
  submit:
    label: Submit claim
    type: humanTask
    form: claim
    rbac:
      any: [employee]
    next: route
  route:
    type: condition
    expr: "{{claim.amount}} > {{threshold}}"
    if: review
    else: pay
  review:
    type: humanTask
    form: claim
    rbac:
      all: [manager, finance]
    next: pay
  pay:
    type: systemTask
    after:
      script: "notify('{{claim.amount}}')"
"#;

    fn sample() -> Definition {
        let schema: FormSchema = serde_json::from_value(json!({
            "type": "object",
            "required": ["amount"]
        }))
        .unwrap();

        Definition::new("wf1", "1.0")
            .with_secret("TOKEN", "abc")
            .with_variable("limits", json!({ "max": 5, "tags": ["a", "b"] }))
            .with_form("f1", schema)
            .with_step("s1", Step::system_task().with_next("s2"))
            .with_step(
                "s2",
                Step::human_task(
                    HumanTask::new("f1").with_rbac(Rbac::new(["admin"], ["lead"])),
                )
                .with_label("Review")
                .with_next("s3"),
            )
            .with_step(
                "s3",
                Step::condition("{{f1.amount}} > 3", "s1", "").with_before(Hook::new("prep()")),
            )
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a.json")), Some(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.YAML")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.yml")), Some(Format::Yaml));
        assert_eq!(Format::from_path(Path::new("a.toml")), None);
        assert_eq!(Format::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("yml".parse::<Format>().unwrap(), Format::Yaml);
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_parse_json() {
        let raw = br#"{"id":"wf1","version":"1.0","steps":{"s1":{"type":"systemTask","next":"s2"}}}"#;
        let def = parse(raw).unwrap();
        assert_eq!(def.id, "wf1");
        assert_eq!(def.step("s1").unwrap().next, "s2");
    }

    #[test]
    fn test_parse_yaml() {
        let def = parse_with(EXPENSE_YAML.as_bytes(), Format::Yaml).unwrap();
        assert_eq!(def.id, "expense");
        assert_eq!(def.steps.len(), 4);
        assert_eq!(def.step("submit").unwrap().display_name(), "Submit claim");
        assert!(matches!(def.step("route").unwrap().kind, StepKind::Condition(_)));
        assert_eq!(
            def.step("pay").unwrap().after,
            Some(Hook::new("notify('{{claim.amount}}')"))
        );
    }

    #[test]
    fn test_malformed_json_is_format_error() {
        let err = parse(b"{ not json").unwrap_err();
        assert!(matches!(err, FlowError::Format { .. }));
    }

    #[test]
    fn test_type_mismatch_is_format_error() {
        let err = parse(br#"{"id":"x","steps":{"s1":{"type":7}}}"#).unwrap_err();
        assert!(matches!(err, FlowError::Format { .. }));

        let err = parse(br#"{"id":["x"]}"#).unwrap_err();
        assert!(matches!(err, FlowError::Format { .. }));
    }

    #[test]
    fn test_parser_performs_no_semantic_checks() {
        // No id, no version, no steps: still a syntactically valid document
        let def = parse(b"{}").unwrap();
        assert_eq!(def, Definition::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let def = sample();
        let text = to_json(&def).unwrap();
        assert_eq!(parse(text.as_bytes()).unwrap(), def);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let def = sample();
        let text = serialize(&def, Format::Yaml).unwrap();
        assert_eq!(parse_with(text.as_bytes(), Format::Yaml).unwrap(), def);
    }

    #[test]
    fn test_parser_for_reports_format() {
        assert_eq!(parser_for(Format::Json).format(), Format::Json);
        assert_eq!(parser_for(Format::Yaml).format(), Format::Yaml);
    }

    #[test]
    fn test_load_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expense.yaml");
        std::fs::write(&path, EXPENSE_YAML).unwrap();

        let def = load(&path).unwrap();
        assert_eq!(def.id, "expense");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, FlowError::Io(_)));
    }
}
