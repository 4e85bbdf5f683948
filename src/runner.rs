//! Launch a child, wait for it, and collect its execution statistics
//!
//! `ProcessRunner::run` goes through the stages in order: validate, launch,
//! wait, collect, release. The first failing stage aborts the run; the
//! process handle is released on every path because it is owned by the
//! run's scope.

use std::time::Duration;

use tracing::{debug, info_span};

use crate::command::CommandLine;
use crate::error::RunError;
use crate::stats::ExecutionStats;
use crate::sys::{self, ProcessHandle};
use crate::timer::Stopwatch;

/// How long to block waiting for the child
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Block until the child terminates, however long that takes
    #[default]
    Indefinite,
    /// Terminate the child and fail with `RunError::WaitTimeout` after this long
    Bounded(Duration),
}

/// A launched child together with the stopwatch started for it
#[derive(Debug)]
pub struct LaunchedProcess {
    pub handle: ProcessHandle,
    pub stopwatch: Stopwatch,
}

/// Runs one child process and measures it
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    wait: WaitPolicy,
}

impl ProcessRunner {
    pub fn new(wait: WaitPolicy) -> Self {
        Self { wait }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.wait
    }

    /// Validate raw tokens, then run them
    ///
    /// An empty token list fails with `RunError::NoProgramName` before any
    /// OS call is made.
    pub fn run_args<I, S>(&self, tokens: I) -> Result<ExecutionStats, RunError>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString>,
    {
        let command = CommandLine::new(tokens)?;
        self.run(&command)
    }

    /// Run the command and return its statistics
    ///
    /// # Example
    /// ```no_run
    /// use proctime::command::CommandLine;
    /// use proctime::runner::ProcessRunner;
    ///
    /// let cmd = CommandLine::new(["sh", "-c", "exit 3"]).unwrap();
    /// let stats = ProcessRunner::default().run(&cmd).unwrap();
    /// assert_eq!(stats.exit_code, 3);
    /// ```
    pub fn run(&self, command: &CommandLine) -> Result<ExecutionStats, RunError> {
        let span = info_span!("run", program = ?command.program());
        let _enter = span.enter();

        let LaunchedProcess {
            mut handle,
            stopwatch,
        } = Self::launch(command)?;

        debug!(pid = ?handle.id(), wait = ?self.wait, "waiting for child");
        handle.wait(self.wait)?;
        let wall_time_us = stopwatch.elapsed_us();

        let stats = Self::collect(&handle, wall_time_us);
        handle.close();
        stats
    }

    /// Start the stopwatch and create the child
    pub fn launch(command: &CommandLine) -> Result<LaunchedProcess, RunError> {
        let stopwatch = Stopwatch::start();
        let handle = sys::launch(command)?;
        Ok(LaunchedProcess { handle, stopwatch })
    }

    /// Query a terminated child's counters
    pub fn collect(handle: &ProcessHandle, wall_time_us: u64) -> Result<ExecutionStats, RunError> {
        let exit_code = handle.exit_code()?;
        let cpu = handle.cpu_times()?;
        let memory = handle.memory_counters()?;

        debug!(
            exit_code,
            wall_time_us,
            user_time_us = cpu.user_us,
            system_time_us = cpu.system_us,
            "collected stats"
        );
        Ok(ExecutionStats {
            wall_time_us,
            user_time_us: cpu.user_us,
            system_time_us: cpu.system_us,
            exit_code,
            memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_waits_indefinitely() {
        assert_eq!(ProcessRunner::default().wait_policy(), WaitPolicy::Indefinite);
    }

    #[test]
    fn test_empty_args_rejected() {
        let err = ProcessRunner::default()
            .run_args(Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, RunError::NoProgramName));
        assert_eq!(err.to_string(), "No program name.");
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use crate::error::OsCall;

        #[test]
        fn test_noop_exits_zero_quickly() {
            let stats = ProcessRunner::default().run_args(["true"]).unwrap();
            assert_eq!(stats.exit_code, 0);
            assert!(stats.wall_time_us < 1_000_000);
        }

        #[test]
        fn test_exit_code_42() {
            let stats = ProcessRunner::default()
                .run_args(["sh", "-c", "exit 42"])
                .unwrap();
            assert_eq!(stats.exit_code, 42);
        }

        #[test]
        fn test_wall_time_covers_child_runtime() {
            let stats = ProcessRunner::default()
                .run_args(["sleep", "0.2"])
                .unwrap();
            assert!(stats.wall_time_us >= 200_000);
            assert_eq!(stats.wall_time_hms().total_seconds(), stats.wall_time_us / 1_000_000);
        }

        #[test]
        fn test_cpu_bound_child_accrues_user_time() {
            let stats = ProcessRunner::default()
                .run_args(["sh", "-c", "i=0; while [ $i -lt 200000 ]; do i=$((i+1)); done"])
                .unwrap();
            assert_eq!(stats.exit_code, 0);
            assert!(stats.user_time_us + stats.system_time_us > 0);
        }

        #[test]
        fn test_missing_program_is_launch_failure() {
            let err = ProcessRunner::default()
                .run_args(["/nonexistent/proctime-test-binary"])
                .unwrap_err();
            assert_eq!(err.call(), Some(OsCall::CreateProcess));
            assert!(err.to_string().contains("failed"));
        }

        #[test]
        fn test_bounded_wait_times_out() {
            let runner = ProcessRunner::new(WaitPolicy::Bounded(Duration::from_millis(100)));
            let err = runner.run_args(["sleep", "5"]).unwrap_err();
            assert!(matches!(err, RunError::WaitTimeout { .. }));
        }

        #[test]
        fn test_launch_then_collect_by_hand() {
            let command = CommandLine::new(["sh", "-c", "exit 5"]).unwrap();
            let mut launched = ProcessRunner::launch(&command).unwrap();
            launched.handle.wait(WaitPolicy::Indefinite).unwrap();
            let wall = launched.stopwatch.elapsed_us();
            let stats = ProcessRunner::collect(&launched.handle, wall).unwrap();
            assert_eq!(stats.exit_code, 5);
            assert_eq!(stats.wall_time_us, wall);
        }
    }

    #[cfg(windows)]
    mod windows {
        use super::*;

        #[test]
        fn test_exit_code_42() {
            let stats = ProcessRunner::default()
                .run_args(["cmd", "/C", "exit 42"])
                .unwrap();
            assert_eq!(stats.exit_code, 42);
            assert!(stats.memory.quota_peak_paged_pool_bytes.is_some());
        }
    }
}
