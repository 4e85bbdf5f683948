//! proctime - run a program and report its execution statistics
//!
//! This library launches a child process, waits for it to terminate and
//! collects wall time, user/system CPU time, memory counters and the exit
//! code from the OS, then renders them as a text or JSON report.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod json_output;
pub mod report;
pub mod runner;
pub mod stats;
pub mod sys;
pub mod timer;

pub use command::CommandLine;
pub use error::{OsCall, RunError};
pub use runner::{ProcessRunner, WaitPolicy};
pub use stats::{ExecutionStats, Hms, MemoryCounters};
