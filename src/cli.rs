//! CLI argument capture for proctime
//!
//! proctime is a transparent wrapper: everything after its own executable
//! path belongs to the child, including arguments that look like flags.

use std::ffi::OsString;

use clap::{Parser, ValueEnum};

/// Output format for the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    #[default]
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "proctime")]
#[command(about = "Run a program and report its execution statistics", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Program to run, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        value_parser = clap::value_parser!(OsString),
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<OsString>,
}
