//! JSON output format for a measured run

use serde::{Deserialize, Serialize};

use crate::command::CommandLine;
use crate::stats::{ExecutionStats, Hms, MemoryCounters};

/// Complete JSON document for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    pub version: String,
    pub format: String,
    /// Reconstructed command line
    pub command: String,
    /// Program followed by its arguments, lossily decoded
    pub argv: Vec<String>,
    pub user_time_us: u64,
    pub system_time_us: u64,
    pub wall_time_us: u64,
    pub wall_time_hms: Hms,
    pub memory: MemoryCounters,
    pub exit_code: i32,
}

impl JsonOutput {
    pub fn new(command: &CommandLine, stats: &ExecutionStats) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "proctime-json-v1".to_string(),
            command: command.to_string(),
            argv: command
                .tokens()
                .iter()
                .map(|token| token.to_string_lossy().into_owned())
                .collect(),
            user_time_us: stats.user_time_us,
            system_time_us: stats.system_time_us,
            wall_time_us: stats.wall_time_us,
            wall_time_hms: stats.wall_time_hms(),
            memory: stats.memory,
            exit_code: stats.exit_code,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
