//! Cancel-and-restart timer for work that should only run once input
//! settles, such as re-running conflict detection after a burst of edits.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, deadline: None }
    }

    /// Restart the timer. Any pending deadline is dropped.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once per trigger, when the delay has elapsed without another
    /// trigger.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time left before the pending deadline, for poll timeouts.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_delay() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        assert!(!d.ready(start));
        d.trigger(start);
        assert!(!d.ready(start + Duration::from_millis(299)));
        assert!(d.ready(start + Duration::from_millis(300)));
        assert!(!d.ready(start + Duration::from_millis(600)));
    }

    #[test]
    fn retrigger_pushes_deadline_back() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(300));
        d.trigger(start);
        d.trigger(start + Duration::from_millis(200));
        assert!(!d.ready(start + Duration::from_millis(400)));
        assert_eq!(d.remaining(start + Duration::from_millis(400)), Some(Duration::from_millis(100)));
        assert!(d.ready(start + Duration::from_millis(500)));
    }

    #[test]
    fn cancel_clears_pending() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_millis(10));
        d.trigger(start);
        assert!(d.is_pending());
        d.cancel();
        assert!(!d.ready(start + Duration::from_secs(1)));
        assert_eq!(d.remaining(start), None);
    }
}
