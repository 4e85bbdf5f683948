//! Error taxonomy for a measured run
//!
//! Every failure is fatal to the run: a usage error when there is nothing to
//! launch, or an OS call failure tagged with the failing primitive and the
//! OS-reported error code.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Process-control primitive that can fail during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsCall {
    /// Creating the child process
    CreateProcess,
    /// Waiting for the child to terminate
    WaitForSingleObject,
    /// Reading the child's exit code
    GetExitCodeProcess,
    /// Reading user/kernel CPU time
    GetProcessTimes,
    /// Reading memory counters
    GetProcessMemoryInfo,
}

impl OsCall {
    /// Name of the platform call that fills this role
    #[cfg(windows)]
    pub fn name(self) -> &'static str {
        match self {
            OsCall::CreateProcess => "CreateProcess",
            OsCall::WaitForSingleObject => "WaitForSingleObject",
            OsCall::GetExitCodeProcess => "GetExitCodeProcess",
            OsCall::GetProcessTimes => "GetProcessTimes",
            OsCall::GetProcessMemoryInfo => "GetProcessMemoryInfo",
        }
    }

    /// Name of the platform call that fills this role
    #[cfg(not(windows))]
    pub fn name(self) -> &'static str {
        match self {
            OsCall::CreateProcess => "spawn",
            OsCall::WaitForSingleObject => "wait4",
            OsCall::GetExitCodeProcess => "wait4 (exit status)",
            OsCall::GetProcessTimes => "wait4 (rusage times)",
            OsCall::GetProcessMemoryInfo => "wait4 (rusage memory)",
        }
    }
}

impl fmt::Display for OsCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that abort a measured run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("No program name.")]
    NoProgramName,

    #[error("{call} failed (error code: {code})")]
    Os { call: OsCall, code: i32 },

    #[error("wait for child timed out after {timeout:?}")]
    WaitTimeout { timeout: Duration },
}

impl RunError {
    pub(crate) fn os(call: OsCall, code: i32) -> Self {
        RunError::Os { call, code }
    }

    /// OS-reported error code, if this error came from an OS call
    pub fn os_code(&self) -> Option<i32> {
        match self {
            RunError::Os { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The failing OS call, if any
    pub fn call(&self) -> Option<OsCall> {
        match self {
            RunError::Os { call, .. } => Some(*call),
            RunError::WaitTimeout { .. } => Some(OsCall::WaitForSingleObject),
            RunError::NoProgramName => None,
        }
    }
}
