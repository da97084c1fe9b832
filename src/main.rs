//! flowdef CLI - validate and inspect workflow definitions

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;

use flowdef::config::{ConfigStore, DEFAULT_CONFIG_FILE};
use flowdef::parser::{self, Format};
use flowdef::{validate, validate_submission, Definition, FixSuggestion, FlowError, SubmissionOutcome};

#[derive(Parser)]
#[command(name = "flowdef")]
#[command(about = "Parse and validate workflow definitions")]
#[command(version)]
struct Cli {
    /// Configuration file used to resolve secrets
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a definition file and list every defect
    Validate {
        /// Path to a .json or .yaml definition
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },

    /// Check a form submission for a human-task step
    Submit {
        file: PathBuf,

        #[arg(short, long)]
        step: String,

        /// Inline JSON, or @path to a JSON file
        #[arg(short, long)]
        payload: String,
    },

    /// Decide whether the given roles may perform a step
    Access {
        file: PathBuf,

        #[arg(short, long)]
        step: String,

        /// Actor role (repeatable)
        #[arg(short, long = "role")]
        roles: Vec<String>,
    },

    /// Re-serialize a definition in another format
    Convert {
        file: PathBuf,

        #[arg(long, value_enum)]
        to: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

impl From<OutputFormat> for Format {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Json => Format::Json,
            OutputFormat::Yaml => Format::Yaml,
        }
    }
}

fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file, format } => validate_file(&file, &cli.config, format),
        Commands::Submit {
            file,
            step,
            payload,
        } => submit(&file, &cli.config, &step, &payload),
        Commands::Access { file, step, roles } => access(&file, &cli.config, &step, &roles),
        Commands::Convert { file, to } => convert(&file, to.into()),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

/// Parse a definition file and fill its secrets from configuration
fn load_definition(file: &Path, config_path: &Path) -> Result<Definition, FlowError> {
    let store = ConfigStore::open(config_path)?;
    let definition = parser::load(file)?;
    Ok(definition.with_resolved_secrets(&store.current()))
}

fn validate_file(file: &Path, config_path: &Path, format: ReportFormat) -> Result<bool, FlowError> {
    let definition = load_definition(file, config_path)?;
    let report = validate(&definition);

    match format {
        ReportFormat::Json => {
            let text = serde_json::to_string_pretty(&report).map_err(|e| FlowError::Serialize {
                details: e.to_string(),
            })?;
            println!("{}", text);
        }
        ReportFormat::Text if report.is_valid() => {
            println!(
                "{} Definition '{}' is valid",
                "✓".green(),
                file.display()
            );
            println!("  Id: {} (version {})", definition.id, definition.version);
            println!(
                "  {} steps, {} forms",
                definition.steps.len(),
                definition.forms.len()
            );
        }
        ReportFormat::Text => {
            println!(
                "{} Definition '{}' has {} defect(s)",
                "✗".red(),
                file.display(),
                report.len()
            );
            for defect in &report {
                println!(
                    "  {} [{}] {}",
                    defect.kind.to_string().red(),
                    defect.entity_id.cyan(),
                    defect.message
                );
                if let Some(suggestion) = &defect.suggestion {
                    println!("      {} {}", "Fix:".yellow(), suggestion);
                }
            }
        }
    }

    Ok(report.is_valid())
}

fn submit(file: &Path, config_path: &Path, step: &str, payload: &str) -> Result<bool, FlowError> {
    let definition = load_definition(file, config_path)?;
    let payload = read_payload(payload)?;

    match validate_submission(&definition, step, &payload)? {
        SubmissionOutcome::Accepted => {
            println!("{} Submission for step '{}' accepted", "✓".green(), step);
            Ok(true)
        }
        SubmissionOutcome::Rejected(violations) => {
            println!(
                "{} Submission for step '{}' rejected ({} violation(s))",
                "✗".red(),
                step,
                violations.len()
            );
            for v in &violations {
                let path = if v.path.is_empty() { "/" } else { v.path.as_str() };
                println!("  {} {}: {}", path.cyan(), v.constraint.yellow(), v.message);
            }
            Ok(false)
        }
    }
}

fn read_payload(arg: &str) -> Result<Value, FlowError> {
    let text = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| FlowError::Payload {
        details: e.to_string(),
    })
}

fn access(file: &Path, config_path: &Path, step: &str, roles: &[String]) -> Result<bool, FlowError> {
    let definition = load_definition(file, config_path)?;
    let allowed = definition.is_allowed(step, roles)?;

    if allowed {
        println!("{} allowed", "✓".green());
    } else {
        println!("{} denied", "✗".red());
    }
    Ok(allowed)
}

fn convert(file: &Path, to: Format) -> Result<bool, FlowError> {
    let definition = parser::load(file)?;
    print!("{}", ensure_trailing_newline(parser::serialize(&definition, to)?));
    Ok(true)
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
