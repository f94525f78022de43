//! The errdata Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

pub mod args;
pub mod output;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::annotated::{ErrorWithParams, Interpolate};
use crate::params::ParamMap;
use crate::template::Template;
use crate::value::Value;

use self::args::{CheckLevel, Command, DataArgs, ErrdataArgs};

// ============================================================================
// CLI ERRORS
// ============================================================================

/// Failures of the command line front end itself.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("cannot read {path}")]
    #[diagnostic(code(errdata::cli::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not a valid JSON parameter map")]
    #[diagnostic(code(errdata::cli::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} is not a valid YAML parameter map")]
    #[diagnostic(code(errdata::cli::yaml))]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("'{0}' is not a KEY=VALUE assignment")]
    #[diagnostic(code(errdata::cli::assignment), help("write --set Name=value"))]
    Assignment(String),

    #[error("an empty format string needs --cause")]
    #[diagnostic(code(errdata::cli::empty_format))]
    EmptyFormat,
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = ErrdataArgs::parse();
    init_tracing(args.verbose);

    let code = match args.command {
        Command::Tokens { format } => {
            output::print_tokens(Template::parse(&format).tokens());
            0
        }
        Command::Ast { format } => handle_ast(&format),
        Command::Check {
            format,
            level,
            data,
        } => handle_check(&format, level, &data),
        Command::Render { format, data } => handle_render(&format, &data),
    };
    process::exit(code);
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

fn handle_ast(format: &str) -> i32 {
    let template = Template::parse(format);
    output::print_line(&template.ast().pretty());
    match template.parse_error() {
        Some(err) => {
            output::print_report(err.clone());
            1
        }
        None => 0,
    }
}

fn handle_check(format: &str, level: CheckLevel, data: &DataArgs) -> i32 {
    let inputs = match Inputs::load(data) {
        Ok(inputs) => inputs,
        Err(err) => return fail(err),
    };
    let template = Template::parse(format);
    let cause = inputs.cause.as_ref().map(|c| c as &(dyn std::error::Error + 'static));
    let result = match level {
        CheckLevel::Syntax => template.verify_syntax(),
        CheckLevel::Own => template.verify_own(&inputs.own, cause),
        CheckLevel::Passed => template.verify_passed(&inputs.own, &inputs.passed, cause),
    };
    match result {
        Ok(()) => {
            output::print_ok("ok");
            0
        }
        Err(err) => {
            output::print_report(err);
            1
        }
    }
}

fn handle_render(format: &str, data: &DataArgs) -> i32 {
    let inputs = match Inputs::load(data) {
        Ok(inputs) => inputs,
        Err(err) => return fail(err),
    };
    let err = match inputs.cause {
        Some(cause) => ErrorWithParams::wrap_with_params(cause, format, inputs.own, &[]),
        None if format.is_empty() => return fail(CliError::EmptyFormat),
        None => ErrorWithParams::with_params(format, inputs.own),
    };
    output::print_line(&err.interpolate(&inputs.passed));
    0
}

fn fail(err: CliError) -> i32 {
    output::print_report(err);
    2
}

// ============================================================================
// INPUT LOADING
// ============================================================================

struct Inputs {
    own: ParamMap,
    passed: ParamMap,
    cause: Option<io::Error>,
}

impl Inputs {
    fn load(data: &DataArgs) -> Result<Self, CliError> {
        let mut own = match &data.params {
            Some(path) => load_map(path)?,
            None => ParamMap::new(),
        };
        for assignment in &data.set {
            let (key, value) = parse_assignment(assignment)?;
            own.insert(key, value);
        }
        let passed = match &data.passed {
            Some(path) => load_map(path)?,
            None => own.clone(),
        };
        let cause = data
            .cause
            .as_ref()
            .map(|message| io::Error::new(io::ErrorKind::Other, message.clone()));
        Ok(Self { own, passed, cause })
    }
}

/// Reads a parameter map, choosing YAML for `.yaml`/`.yml` and JSON otherwise.
fn load_map(path: &Path) -> Result<ParamMap, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    debug!(path = %path.display(), yaml, "loading parameter map");
    if yaml {
        serde_yaml::from_str(&text).map_err(|source| CliError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_json::from_str(&text).map_err(|source| CliError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_assignment(assignment: &str) -> Result<(String, Value), CliError> {
    let (key, raw) = assignment
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| CliError::Assignment(assignment.to_string()))?;
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    Ok((key.to_string(), value))
}
