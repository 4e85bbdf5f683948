//! Windows backend: `CreateProcessW` and the process query calls
//!
//! The process handle and the primary-thread handle are two separately
//! owned `OwnedHandle`s, each closed exactly once.

use std::iter;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::time::Duration;

use tracing::{debug, warn};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, FILETIME, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows::Win32::System::ProcessStatus::{
    GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS, PROCESS_MEMORY_COUNTERS_EX,
};
use windows::Win32::System::Threading::{
    CreateProcessW, GetExitCodeProcess, GetProcessTimes, TerminateProcess, WaitForSingleObject,
    INFINITE, PROCESS_CREATION_FLAGS, PROCESS_INFORMATION, STARTUPINFOW,
};

use crate::command::CommandLine;
use crate::error::{OsCall, RunError};
use crate::runner::WaitPolicy;
use crate::stats::{CpuTimes, MemoryCounters};

/// Exit code given to a child terminated after a bounded wait
const TIMEOUT_EXIT_CODE: u32 = 1;

/// Win32 error code carried by a `windows::core::Error`
fn win32_code(err: &windows::core::Error) -> i32 {
    let hresult = err.code().0 as u32;
    if hresult & 0xFFFF_0000 == 0x8007_0000 {
        (hresult & 0xFFFF) as i32
    } else {
        hresult as i32
    }
}

fn last_error(call: OsCall) -> RunError {
    // SAFETY: reads the calling thread's last-error value
    let code = unsafe { GetLastError() };
    RunError::os(call, code.0 as i32)
}

/// Single OS handle, closed on `close()` or drop, whichever comes first
#[derive(Debug, Default)]
pub(crate) struct OwnedHandle(HANDLE);

impl OwnedHandle {
    pub fn raw(&self) -> HANDLE {
        self.0
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_invalid()
    }

    /// Close the handle; a no-op on a null or already-closed handle
    pub fn close(&mut self) {
        let handle = mem::take(&mut self.0);
        if !handle.is_invalid() {
            // SAFETY: the handle was returned by CreateProcessW and is owned here
            let _ = unsafe { CloseHandle(handle) };
        }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owned child process: process handle plus primary-thread handle
#[derive(Debug, Default)]
pub struct ProcessHandle {
    process: OwnedHandle,
    thread: OwnedHandle,
    id: Option<u32>,
}

/// Create the child with the parent's standard handles inherited
///
/// The reconstructed command line is passed verbatim as `lpCommandLine`.
pub fn launch(command: &CommandLine) -> Result<ProcessHandle, RunError> {
    let mut wide: Vec<u16> = command
        .joined()
        .encode_wide()
        .chain(iter::once(0))
        .collect();

    let startup_info = STARTUPINFOW {
        cb: mem::size_of::<STARTUPINFOW>() as u32,
        ..Default::default()
    };
    let mut proc_info = PROCESS_INFORMATION::default();

    // SAFETY: `wide` is a writable, NUL-terminated buffer that outlives the
    // call; the info structs are valid for reads/writes
    unsafe {
        CreateProcessW(
            PCWSTR::null(),
            PWSTR(wide.as_mut_ptr()),
            None,
            None,
            true,
            PROCESS_CREATION_FLAGS(0),
            None,
            PCWSTR::null(),
            &startup_info,
            &mut proc_info,
        )
    }
    .map_err(|e| RunError::os(OsCall::CreateProcess, win32_code(&e)))?;

    debug!(pid = proc_info.dwProcessId, program = ?command.program(), "launched child");
    Ok(ProcessHandle {
        process: OwnedHandle(proc_info.hProcess),
        thread: OwnedHandle(proc_info.hThread),
        id: Some(proc_info.dwProcessId),
    })
}

impl ProcessHandle {
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.process.is_closed() && self.thread.is_closed()
    }

    /// Block on the process handle until it signals termination
    ///
    /// With `WaitPolicy::Bounded` the child is terminated once the bound
    /// elapses, and `RunError::WaitTimeout` is returned.
    pub fn wait(&mut self, policy: WaitPolicy) -> Result<(), RunError> {
        let millis = match policy {
            WaitPolicy::Indefinite => INFINITE,
            WaitPolicy::Bounded(timeout) => {
                u32::try_from(timeout.as_millis()).unwrap_or(INFINITE - 1)
            }
        };

        // SAFETY: the process handle is owned and open
        let event = unsafe { WaitForSingleObject(self.process.raw(), millis) };
        if event == WAIT_OBJECT_0 {
            debug!(pid = ?self.id(), "child terminated");
            return Ok(());
        }
        if event == WAIT_TIMEOUT {
            if let WaitPolicy::Bounded(timeout) = policy {
                return Err(self.terminate_after(timeout));
            }
        }
        Err(last_error(OsCall::WaitForSingleObject))
    }

    fn terminate_after(&mut self, timeout: Duration) -> RunError {
        warn!(pid = ?self.id(), ?timeout, "wait timed out, terminating child");
        // SAFETY: the process handle is owned and open
        if let Err(e) = unsafe { TerminateProcess(self.process.raw(), TIMEOUT_EXIT_CODE) } {
            return RunError::os(OsCall::WaitForSingleObject, win32_code(&e));
        }
        // SAFETY: as above
        unsafe { WaitForSingleObject(self.process.raw(), INFINITE) };
        self.close();
        RunError::WaitTimeout { timeout }
    }

    pub fn exit_code(&self) -> Result<i32, RunError> {
        let mut code = 0u32;
        // SAFETY: the process handle is owned; `code` is a valid out-pointer
        unsafe { GetExitCodeProcess(self.process.raw(), &mut code) }
            .map_err(|e| RunError::os(OsCall::GetExitCodeProcess, win32_code(&e)))?;
        Ok(code as i32)
    }

    /// User and kernel time, converted from 100 ns ticks to microseconds
    pub fn cpu_times(&self) -> Result<CpuTimes, RunError> {
        let mut creation = FILETIME::default();
        let mut exit = FILETIME::default();
        let mut kernel = FILETIME::default();
        let mut user = FILETIME::default();
        // SAFETY: the process handle is owned; all out-pointers are live locals
        unsafe {
            GetProcessTimes(
                self.process.raw(),
                &mut creation,
                &mut exit,
                &mut kernel,
                &mut user,
            )
        }
        .map_err(|e| RunError::os(OsCall::GetProcessTimes, win32_code(&e)))?;

        Ok(CpuTimes {
            user_us: filetime_ticks(user) / 10,
            system_us: filetime_ticks(kernel) / 10,
        })
    }

    pub fn memory_counters(&self) -> Result<MemoryCounters, RunError> {
        let mut counters = PROCESS_MEMORY_COUNTERS_EX {
            cb: mem::size_of::<PROCESS_MEMORY_COUNTERS_EX>() as u32,
            ..Default::default()
        };
        // SAFETY: the EX struct starts with the base layout and `cb` says which one it is
        unsafe {
            GetProcessMemoryInfo(
                self.process.raw(),
                &mut counters as *mut PROCESS_MEMORY_COUNTERS_EX as *mut PROCESS_MEMORY_COUNTERS,
                counters.cb,
            )
        }
        .map_err(|e| RunError::os(OsCall::GetProcessMemoryInfo, win32_code(&e)))?;

        Ok(MemoryCounters {
            peak_working_set_bytes: Some(counters.PeakWorkingSetSize as u64),
            peak_page_file_bytes: Some(counters.PeakPagefileUsage as u64),
            page_file_bytes: Some(counters.PagefileUsage as u64),
            private_bytes: Some(counters.PrivateUsage as u64),
            quota_peak_paged_pool_bytes: Some(counters.QuotaPeakPagedPoolUsage as u64),
            quota_peak_nonpaged_pool_bytes: Some(counters.QuotaPeakNonPagedPoolUsage as u64),
            page_fault_count: Some(u64::from(counters.PageFaultCount)),
        })
    }

    /// Close both handles; each is released at most once
    pub fn close(&mut self) {
        self.thread.close();
        self.process.close();
    }
}

fn filetime_ticks(ft: FILETIME) -> u64 {
    (u64::from(ft.dwHighDateTime) << 32) | u64::from(ft.dwLowDateTime)
}
