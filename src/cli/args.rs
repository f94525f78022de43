//! Defines the command-line arguments and subcommands for the errdata CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "errdata",
    version,
    about = "Inspect, check and render errdata message templates."
)]
pub struct ErrdataArgs {
    /// Raise log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the tokens of a format string.
    Tokens {
        /// The format string.
        format: String,
    },
    /// Print the syntax tree of a format string.
    Ast {
        /// The format string.
        format: String,
    },
    /// Validate a format string and report the first problem.
    Check {
        /// The format string.
        format: String,
        /// How far validation goes.
        #[arg(long, value_enum, default_value_t = CheckLevel::Own)]
        level: CheckLevel,
        #[command(flatten)]
        data: DataArgs,
    },
    /// Render a format string into a message.
    Render {
        /// The format string.
        format: String,
        #[command(flatten)]
        data: DataArgs,
    },
}

/// Validation depth for `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckLevel {
    Syntax,
    Own,
    Passed,
}

/// Parameter maps and cause shared by `check` and `render`.
#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// JSON or YAML file with the own parameters (by extension).
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Set one own parameter. The value is read as JSON, or as a plain
    /// string if it is not valid JSON.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// JSON or YAML file with the passed parameters. Defaults to the own
    /// parameters.
    #[arg(long)]
    pub passed: Option<PathBuf>,

    /// Message of a plain cause error, used by `%w` and `$w`.
    #[arg(long)]
    pub cause: Option<String>,
}
