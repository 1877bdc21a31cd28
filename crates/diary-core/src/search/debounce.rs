//! Quiet-window debouncing
//!
//! The debouncer never reads the clock itself; callers pass `now`, which
//! keeps it usable both from the async driver and from synchronous tests.

use std::time::Duration;

use tokio::time::Instant;

/// Holds the latest value until no new value arrives for `interval`
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    interval: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Replace the pending value and restart the quiet window
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// When the pending value becomes due
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.interval)
    }

    /// Take the pending value if its quiet window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Take the pending value immediately
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_once_after_last_push() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));

        debouncer.push("a", t0);
        debouncer.push("ab", t0 + ms(50));
        debouncer.push("abc", t0 + ms(100));
        assert_eq!(debouncer.poll(t0 + ms(350)), None);

        debouncer.push("abcd", t0 + ms(300));
        assert_eq!(debouncer.poll(t0 + ms(599)), None);
        assert_eq!(debouncer.deadline(), Some(t0 + ms(600)));
        assert_eq!(debouncer.poll(t0 + ms(600)), Some("abcd"));
        assert_eq!(debouncer.poll(t0 + ms(900)), None);
    }

    #[test]
    fn test_cancel_and_flush() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));

        debouncer.push(1, t0);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(t0 + ms(1000)), None);

        debouncer.push(2, t0);
        assert_eq!(debouncer.flush(), Some(2));
        assert_eq!(debouncer.deadline(), None);
    }
}
