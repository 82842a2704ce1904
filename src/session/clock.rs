//! Time source and elapsed-time bookkeeping for a recording session.

use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Recorded time across segments.
///
/// `accumulated` holds every finished segment; `live_since` is set only
/// while a segment is recording.
#[derive(Debug, Default, Clone, Copy)]
pub struct ElapsedTime {
    accumulated: Duration,
    live_since: Option<Instant>,
}

impl ElapsedTime {
    pub fn begin_segment(&mut self, now: Instant) {
        self.live_since = Some(now);
    }

    /// Folds the live segment into the total. No-op when nothing is live.
    pub fn end_segment(&mut self, now: Instant) {
        if let Some(since) = self.live_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn is_live(&self) -> bool {
        self.live_since.is_some()
    }

    /// Total including the running segment.
    pub fn total(&self, now: Instant) -> Duration {
        self.accumulated
            + self
                .live_since
                .map(|since| now.saturating_duration_since(since))
                .unwrap_or_default()
    }
}

/// `MM:SS`; minutes keep counting past 59.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_segments() {
        let t0 = Instant::now();
        let mut elapsed = ElapsedTime::default();

        elapsed.begin_segment(t0);
        assert_eq!(elapsed.total(t0 + Duration::from_secs(1)), Duration::from_secs(1));
        elapsed.end_segment(t0 + Duration::from_secs(2));
        assert!(!elapsed.is_live());

        // Paused time does not count.
        elapsed.begin_segment(t0 + Duration::from_secs(10));
        elapsed.end_segment(t0 + Duration::from_secs(11));
        assert_eq!(elapsed.accumulated(), Duration::from_secs(3));

        elapsed.end_segment(t0 + Duration::from_secs(50));
        assert_eq!(elapsed.accumulated(), Duration::from_secs(3));

        elapsed.reset();
        assert_eq!(elapsed.total(t0), Duration::ZERO);
    }

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_millis(3_900)), "00:03");
        assert_eq!(format_elapsed(Duration::from_secs(754)), "12:34");
        assert_eq!(format_elapsed(Duration::from_secs(3_661)), "61:01");
    }
}
