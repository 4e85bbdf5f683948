//! Human-readable report: one fixed label and value per line

use std::io::{self, Write};

use crate::command::CommandLine;
use crate::stats::{format_seconds, ExecutionStats};

fn kbytes(bytes: u64) -> u64 {
    bytes / 1024
}

/// Write the text report for a finished run
///
/// Memory lines whose counter the platform does not report are left out.
pub fn write_text<W: Write>(
    out: &mut W,
    command: &CommandLine,
    stats: &ExecutionStats,
) -> io::Result<()> {
    writeln!(out, "Command: {}", command)?;
    writeln!(out, "User time (microseconds): {}", stats.user_time_us)?;
    writeln!(out, "User time (seconds): {}", format_seconds(stats.user_time_us))?;
    writeln!(out, "System time (microseconds): {}", stats.system_time_us)?;
    writeln!(out, "System time (seconds): {}", format_seconds(stats.system_time_us))?;
    writeln!(out, "Wall time (microseconds): {}", stats.wall_time_us)?;
    writeln!(out, "Wall time (seconds): {}", format_seconds(stats.wall_time_us))?;
    writeln!(out, "Wall time (H:MM:SS): {}", stats.wall_time_hms())?;

    let memory = &stats.memory;
    let kbyte_lines = [
        ("Peak working set size", memory.peak_working_set_bytes),
        ("Peak page file usage", memory.peak_page_file_bytes),
        ("Page file usage", memory.page_file_bytes),
        ("Private usage", memory.private_bytes),
        ("Quota peak paged pool", memory.quota_peak_paged_pool_bytes),
        ("Quota peak nonpaged pool", memory.quota_peak_nonpaged_pool_bytes),
    ];
    for (label, bytes) in kbyte_lines {
        if let Some(bytes) = bytes {
            writeln!(out, "{} (kbytes): {}", label, kbytes(bytes))?;
        }
    }
    if let Some(faults) = memory.page_fault_count {
        writeln!(out, "Page fault count: {}", faults)?;
    }

    writeln!(out, "Process exit code: {}", stats.exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::MemoryCounters;

    fn to_text(command: &CommandLine, stats: &ExecutionStats) -> String {
        let mut buf = Vec::new();
        write_text(&mut buf, command, stats).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn stats(memory: MemoryCounters) -> ExecutionStats {
        ExecutionStats {
            wall_time_us: 3_723_000_123,
            user_time_us: 1_500_000,
            system_time_us: 250,
            exit_code: 42,
            memory,
        }
    }

    fn full_memory() -> MemoryCounters {
        MemoryCounters {
            peak_working_set_bytes: Some(8 * 1024 * 1024),
            peak_page_file_bytes: Some(4096),
            page_file_bytes: Some(2048),
            private_bytes: Some(1023),
            quota_peak_paged_pool_bytes: Some(10 * 1024),
            quota_peak_nonpaged_pool_bytes: Some(1024),
            page_fault_count: Some(321),
        }
    }

    #[test]
    fn test_full_report_lines_in_order() {
        let cmd = CommandLine::new(["prog", "-x", "arg"]).unwrap();
        let text = to_text(&cmd, &stats(full_memory()));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Command: prog -x arg",
                "User time (microseconds): 1500000",
                "User time (seconds): 1.500000",
                "System time (microseconds): 250",
                "System time (seconds): 0.000250",
                "Wall time (microseconds): 3723000123",
                "Wall time (seconds): 3723.000123",
                "Wall time (H:MM:SS): 1:02:03",
                "Peak working set size (kbytes): 8192",
                "Peak page file usage (kbytes): 4",
                "Page file usage (kbytes): 2",
                "Private usage (kbytes): 0",
                "Quota peak paged pool (kbytes): 10",
                "Quota peak nonpaged pool (kbytes): 1",
                "Page fault count: 321",
                "Process exit code: 42",
            ]
        );
    }

    #[test]
    fn test_missing_counters_are_omitted() {
        let cmd = CommandLine::new(["true"]).unwrap();
        let memory = MemoryCounters {
            peak_working_set_bytes: Some(2048),
            page_fault_count: Some(7),
            ..Default::default()
        };
        let text = to_text(&cmd, &stats(memory));

        assert!(text.contains("Peak working set size (kbytes): 2\n"));
        assert!(text.contains("Page fault count: 7\n"));
        assert!(!text.contains("Private usage"));
        assert!(!text.contains("Quota peak"));
        assert!(text.ends_with("Process exit code: 42\n"));
    }

    #[test]
    fn test_negative_exit_code() {
        let cmd = CommandLine::new(["crash"]).unwrap();
        let mut s = stats(MemoryCounters::default());
        s.exit_code = -1073741819;
        assert!(to_text(&cmd, &s).contains("Process exit code: -1073741819"));
    }
}
