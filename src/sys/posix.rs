//! Unix backend: std spawn plus `wait4` resource usage
//!
//! The child is created with `std::process::Command` (stdio inherited) and
//! then owned by pid. Exit status, CPU times and memory counters all come
//! from the single `rusage` that `wait4` returns when the child is reaped.

use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::command::CommandLine;
use crate::error::{OsCall, RunError};
use crate::runner::WaitPolicy;
use crate::stats::{CpuTimes, MemoryCounters};

/// Poll interval for bounded waits
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// What `wait4` reported for a reaped child
#[derive(Debug, Clone, Copy)]
struct Reaped {
    status: libc::c_int,
    user_us: u64,
    system_us: u64,
    max_rss: u64,
    minor_faults: u64,
    major_faults: u64,
}

impl Reaped {
    fn new(status: libc::c_int, usage: &libc::rusage) -> Self {
        Self {
            status,
            user_us: timeval_us(usage.ru_utime),
            system_us: timeval_us(usage.ru_stime),
            max_rss: u64::try_from(usage.ru_maxrss).unwrap_or(0),
            minor_faults: u64::try_from(usage.ru_minflt).unwrap_or(0),
            major_faults: u64::try_from(usage.ru_majflt).unwrap_or(0),
        }
    }
}

fn timeval_us(tv: libc::timeval) -> u64 {
    let secs = u64::try_from(tv.tv_sec).unwrap_or(0);
    let micros = u64::try_from(tv.tv_usec).unwrap_or(0);
    secs * 1_000_000 + micros
}

/// `ru_maxrss` is kilobytes on Linux and the BSDs, bytes on Apple platforms
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn max_rss_bytes(max_rss: u64) -> u64 {
    max_rss
}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn max_rss_bytes(max_rss: u64) -> u64 {
    max_rss * 1024
}

fn wait4(pid: Pid, options: libc::c_int) -> Result<Option<Reaped>, Errno> {
    let mut status: libc::c_int = 0;
    // SAFETY: rusage is plain old data and all-zero is a valid value
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    // SAFETY: both out-pointers reference live locals for the whole call
    let res = unsafe { libc::wait4(pid.as_raw(), &mut status, options, &mut usage) };
    match res {
        -1 => Err(Errno::last()),
        0 => Ok(None),
        _ => Ok(Some(Reaped::new(status, &usage))),
    }
}

fn wait_failed(errno: Errno) -> RunError {
    RunError::os(OsCall::WaitForSingleObject, errno as i32)
}

/// Owned child process, identified by pid until it is reaped
#[derive(Debug, Default)]
pub struct ProcessHandle {
    pid: Option<Pid>,
    reaped: Option<Reaped>,
}

/// Create the child with the parent's stdio inherited
pub fn launch(command: &CommandLine) -> Result<ProcessHandle, RunError> {
    let child = Command::new(command.program())
        .args(command.args())
        .spawn()
        .map_err(|e| {
            RunError::os(
                OsCall::CreateProcess,
                e.raw_os_error().unwrap_or(libc::EINVAL),
            )
        })?;
    let pid = Pid::from_raw(child.id() as i32);
    // Dropping a std Child neither waits nor kills; the pid is ours from here
    drop(child);

    debug!(pid = pid.as_raw(), program = ?command.program(), "launched child");
    Ok(ProcessHandle {
        pid: Some(pid),
        reaped: None,
    })
}

impl ProcessHandle {
    pub fn id(&self) -> Option<u32> {
        self.pid.map(|pid| pid.as_raw() as u32)
    }

    pub fn is_closed(&self) -> bool {
        self.pid.is_none()
    }

    /// Block until the child terminates
    ///
    /// With `WaitPolicy::Bounded` the child is killed and reaped once the
    /// bound elapses, and `RunError::WaitTimeout` is returned.
    pub fn wait(&mut self, policy: WaitPolicy) -> Result<(), RunError> {
        if self.reaped.is_some() {
            return Ok(());
        }
        let pid = self.pid.ok_or_else(|| wait_failed(Errno::ECHILD))?;

        let reaped = match policy {
            WaitPolicy::Indefinite => wait4(pid, 0)
                .map_err(wait_failed)?
                .ok_or_else(|| wait_failed(Errno::ECHILD))?,
            WaitPolicy::Bounded(timeout) => self.wait_bounded(pid, timeout)?,
        };

        debug!(pid = pid.as_raw(), status = reaped.status, "child terminated");
        self.reaped = Some(reaped);
        Ok(())
    }

    fn wait_bounded(&mut self, pid: Pid, timeout: Duration) -> Result<Reaped, RunError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // A bound past the clock's range can never elapse
            debug!(pid = pid.as_raw(), ?timeout, "timeout out of range, waiting indefinitely");
            return wait4(pid, 0)
                .map_err(wait_failed)?
                .ok_or_else(|| wait_failed(Errno::ECHILD));
        };
        loop {
            if let Some(reaped) = wait4(pid, libc::WNOHANG).map_err(wait_failed)? {
                return Ok(reaped);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(pid = pid.as_raw(), ?timeout, "wait timed out, killing child");
                kill(pid, Signal::SIGKILL).map_err(wait_failed)?;
                wait4(pid, 0).map_err(wait_failed)?;
                self.pid = None;
                return Err(RunError::WaitTimeout { timeout });
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    fn reaped(&self, call: OsCall) -> Result<&Reaped, RunError> {
        self.reaped
            .as_ref()
            .ok_or_else(|| RunError::os(call, Errno::ECHILD as i32))
    }

    /// Exit code of the terminated child; `128 + n` when killed by signal `n`
    pub fn exit_code(&self) -> Result<i32, RunError> {
        let status = self.reaped(OsCall::GetExitCodeProcess)?.status;
        if libc::WIFEXITED(status) {
            Ok(libc::WEXITSTATUS(status))
        } else if libc::WIFSIGNALED(status) {
            Ok(128 + libc::WTERMSIG(status))
        } else {
            Err(RunError::os(OsCall::GetExitCodeProcess, Errno::EINVAL as i32))
        }
    }

    pub fn cpu_times(&self) -> Result<CpuTimes, RunError> {
        let reaped = self.reaped(OsCall::GetProcessTimes)?;
        Ok(CpuTimes {
            user_us: reaped.user_us,
            system_us: reaped.system_us,
        })
    }

    /// Peak resident set and page faults; the other categories have no
    /// `rusage` counterpart
    pub fn memory_counters(&self) -> Result<MemoryCounters, RunError> {
        let reaped = self.reaped(OsCall::GetProcessMemoryInfo)?;
        Ok(MemoryCounters {
            peak_working_set_bytes: Some(max_rss_bytes(reaped.max_rss)),
            page_fault_count: Some(reaped.minor_faults + reaped.major_faults),
            ..Default::default()
        })
    }

    /// Release the pid; a no-op when already released or never acquired
    pub fn close(&mut self) {
        if let Some(pid) = self.pid.take() {
            if self.reaped.is_none() {
                // Collect an already-exited child so no zombie outlives the handle
                let _ = wait4(pid, libc::WNOHANG);
            }
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.close();
    }
}
