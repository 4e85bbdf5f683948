use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use proctime::cli::{Cli, OutputFormat};
use proctime::config::{Config, LOG_VAR};
use proctime::json_output::JsonOutput;
use proctime::{report, CommandLine, ProcessRunner};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber when a filter is configured
fn init_tracing(filter: Option<&str>) -> Result<()> {
    if let Some(directives) = filter {
        let filter = EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {}: {:?}", LOG_VAR, directives))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// Run the wrapped command and print its report, returning the child's exit code
fn run() -> Result<i32> {
    let config = Config::from_env()?;
    init_tracing(config.log_filter.as_deref())?;

    let cli = Cli::try_parse()?;
    let command = CommandLine::new(cli.command)?;

    let runner = ProcessRunner::new(config.wait);
    let stats = runner.run(&command)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match config.format {
        OutputFormat::Text => report::write_text(&mut out, &command, &stats)?,
        OutputFormat::Json => writeln!(out, "{}", JsonOutput::new(&command, &stats).to_json()?)?,
    }
    out.flush()?;

    Ok(stats.exit_code)
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            println!("Exception: {:#}", err);
            1
        }
    };
    // Exit with the measured program's exit code
    std::process::exit(code);
}
