//! Error keyword scan over container logs.

use super::types::LogSummary;

/// Case-sensitive substrings that mark a log line as an error.
pub const ERROR_KEYWORDS: [&str; 10] = [
    "ERROR",
    "FATAL",
    "Exception",
    "failed",
    "Failed",
    "error",
    "panic",
    "PANIC",
    "CRITICAL",
    "critical",
];

/// Maximum sample lines kept per service.
pub const MAX_SAMPLE_LINES: usize = 5;

/// Maximum characters kept per sample line.
pub const MAX_LINE_CHARS: usize = 200;

/// Count lines containing any keyword, each line at most once.
#[must_use]
pub fn scan_logs(logs: &str) -> LogSummary {
    let mut summary = LogSummary::default();

    for line in logs.lines() {
        if !ERROR_KEYWORDS.iter().any(|keyword| line.contains(keyword)) {
            continue;
        }
        summary.errors_found = summary.errors_found.saturating_add(1);
        if summary.sample_error_lines.len() < MAX_SAMPLE_LINES {
            summary
                .sample_error_lines
                .push(line.chars().take(MAX_LINE_CHARS).collect());
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_scan_counts_each_line_once() {
        let logs = "ok\nERROR: failed to connect\nall good\nFATAL panic\n";
        let summary = scan_logs(logs);
        assert_eq!(summary.errors_found, 2);
        assert_eq!(
            summary.sample_error_lines,
            vec!["ERROR: failed to connect", "FATAL panic"]
        );
    }

    #[test]
    fn test_scan_is_case_sensitive() {
        let summary = scan_logs("Error: mixed case is not a keyword\nFAILED upper\n");
        assert_eq!(summary.errors_found, 0);
        assert!(summary.sample_error_lines.is_empty());
    }

    #[test]
    fn test_scan_caps_samples_but_not_count() {
        let logs = (0..8)
            .map(|i| format!("error {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let summary = scan_logs(&logs);
        assert_eq!(summary.errors_found, 8);
        assert_eq!(summary.sample_error_lines.len(), MAX_SAMPLE_LINES);
        assert_eq!(summary.sample_error_lines[4], "error 4");
    }

    #[test]
    fn test_scan_truncates_long_lines_on_char_boundary() {
        let line = format!("critical {}", "é".repeat(400));
        let summary = scan_logs(&line);
        assert_eq!(summary.sample_error_lines[0].chars().count(), MAX_LINE_CHARS);
    }

    #[test]
    fn test_scan_empty_logs() {
        assert_eq!(scan_logs(""), LogSummary::default());
    }

    proptest! {
        #[test]
        fn prop_samples_bounded(lines in proptest::collection::vec(".{0,300}", 0..20)) {
            let summary = scan_logs(&lines.join("\n"));
            prop_assert!(summary.sample_error_lines.len() <= MAX_SAMPLE_LINES);
            prop_assert!(summary.sample_error_lines.iter().all(|l| l.chars().count() <= MAX_LINE_CHARS));
            prop_assert!(summary.sample_error_lines.len() as u32 <= summary.errors_found);
        }
    }
}
