//! Platform process-control surface
//!
//! Both backends expose the same shape: `launch` creates the child with the
//! parent's standard handles inherited and returns an owning
//! `ProcessHandle`; the handle then waits, answers the exit-code, CPU-time
//! and memory queries, and releases its OS resources exactly once.

#[cfg(unix)]
mod posix;
#[cfg(unix)]
pub use posix::{launch, ProcessHandle};

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{launch, ProcessHandle};
