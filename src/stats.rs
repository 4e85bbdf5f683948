//! Execution statistics of a finished child process

use std::fmt;

use serde::{Deserialize, Serialize};

const MICROS_PER_SEC: u64 = 1_000_000;

/// OS-reported memory accounting for the child
///
/// Each counter is optional because not every platform reports every
/// category. Byte counts are as reported by the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCounters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_working_set_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_page_file_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_file_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_peak_paged_pool_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_peak_nonpaged_pool_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_fault_count: Option<u64>,
}

/// User and kernel CPU time, in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user_us: u64,
    pub system_us: u64,
}

/// Statistics of one measured run
///
/// Produced once after the child terminates and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    /// Launch to wait-return, in microseconds
    pub wall_time_us: u64,
    /// CPU time spent in the child's own code
    pub user_time_us: u64,
    /// CPU time spent in the kernel on the child's behalf
    pub system_time_us: u64,
    pub exit_code: i32,
    pub memory: MemoryCounters,
}

impl ExecutionStats {
    pub fn wall_time_hms(&self) -> Hms {
        Hms::from_micros(self.wall_time_us)
    }
}

/// Hours/minutes/seconds decomposition of a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hms {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Hms {
    /// Decompose a microsecond duration, truncating sub-second precision
    ///
    /// # Example
    /// ```
    /// use proctime::stats::Hms;
    ///
    /// let hms = Hms::from_micros(3_723_500_000);
    /// assert_eq!((hms.hours, hms.minutes, hms.seconds), (1, 2, 3));
    /// assert_eq!(hms.to_string(), "1:02:03");
    /// ```
    pub fn from_micros(duration_us: u64) -> Self {
        let sec_total = duration_us / MICROS_PER_SEC;
        let min_total = sec_total / 60;
        Self {
            hours: min_total / 60,
            minutes: min_total % 60,
            seconds: sec_total % 60,
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Render microseconds as seconds with exact microsecond precision
pub fn format_seconds(duration_us: u64) -> String {
    format!(
        "{}.{:06}",
        duration_us / MICROS_PER_SEC,
        duration_us % MICROS_PER_SEC
    )
}
