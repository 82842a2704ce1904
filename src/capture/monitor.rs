//! Diagnostic stream watcher for a running capture process.
//!
//! Looks at the first few stderr lines for a failure marker. Capture
//! tools that fail (bad display, busy device) say so immediately; a
//! healthy recorder can run for an hour without a newline worth reading,
//! so inspection is bounded and the remainder is simply drained.

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// How many lines to inspect before giving up.
    pub max_lines: usize,
    /// A line matching this is reported as a failure.
    pub failure_marker: Regex,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            max_lines: 10,
            failure_marker: Regex::new("Error").expect("static regex"),
        }
    }
}

/// What the watcher concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorVerdict {
    /// A marker line was found and reported.
    Failed(String),
    /// `max_lines` clean lines were seen.
    Clean,
    /// The stream ended before anything was found.
    Closed,
}

/// Reads `stream` line by line, reporting the first marker line through
/// `on_failure`. The callback is `FnOnce`: it fires at most once.
///
/// After the verdict the rest of the stream is drained so the child never
/// blocks on a full pipe.
pub async fn watch<R, F>(stream: R, options: &MonitorOptions, on_failure: F) -> MonitorVerdict
where
    R: AsyncRead + Unpin,
    F: FnOnce(String),
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut verdict = MonitorVerdict::Clean;

    for _ in 0..options.max_lines {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return MonitorVerdict::Closed,
            Ok(_) => {}
            Err(e) => {
                log::warn!("[CAPTURE] Failed to read capture diagnostics: {}", e);
                return MonitorVerdict::Closed;
            }
        }

        // Tools sometimes print non-UTF-8 device names.
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        log::debug!("[CAPTURE] stderr: {}", trimmed);

        if options.failure_marker.is_match(trimmed) {
            log::error!("[CAPTURE] Capture tool reported: {}", trimmed);
            verdict = MonitorVerdict::Failed(trimmed.to_string());
            break;
        }
    }

    if let MonitorVerdict::Failed(message) = &verdict {
        on_failure(message.clone());
    }

    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn reports_first_marker_once() {
        let input: &[u8] = b"Input #0, x11grab\nError opening display :9\nError again\n";
        let seen = RefCell::new(Vec::new());
        let verdict = watch(input, &MonitorOptions::default(), |line| {
            seen.borrow_mut().push(line)
        })
        .await;

        assert_eq!(verdict, MonitorVerdict::Failed("Error opening display :9".to_string()));
        assert_eq!(*seen.borrow(), vec!["Error opening display :9".to_string()]);
    }

    #[tokio::test]
    async fn marker_after_limit_is_not_inspected() {
        let mut input = String::new();
        for i in 0..10 {
            input.push_str(&format!("info line {i}\n"));
        }
        input.push_str("Error: too late\n");

        let mut fired = false;
        let verdict = watch(input.as_bytes(), &MonitorOptions::default(), |_| fired = true).await;
        assert_eq!(verdict, MonitorVerdict::Clean);
        assert!(!fired);
    }

    #[tokio::test]
    async fn closed_stream_without_marker() {
        let input: &[u8] = b"just one line\n";
        let verdict = watch(input, &MonitorOptions::default(), |_| panic!("no failure")).await;
        assert_eq!(verdict, MonitorVerdict::Closed);
    }

    #[tokio::test]
    async fn custom_marker() {
        let options = MonitorOptions {
            max_lines: 3,
            failure_marker: Regex::new(r"(?i)cannot open").unwrap(),
        };
        let input: &[u8] = b"Cannot open display\n";
        let verdict = watch(input, &options, |_| {}).await;
        assert!(matches!(verdict, MonitorVerdict::Failed(_)));
    }
}
