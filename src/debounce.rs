use std::time::{Duration, Instant};

/// Quiet period before margin/threshold edits trigger a recomposite.
pub const COMPOSITE_DEBOUNCE: Duration = Duration::from_millis(50);

/// Trailing-edge debounce: every `trigger` pushes the deadline out, and
/// `fire` reports true once, after the deadline passes with no new trigger.
#[derive(Clone, Debug)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the pending deadline, if any.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending deadline; returns whether one was pending.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new(COMPOSITE_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_quiet_period() {
        let t0 = Instant::now();
        let mut d = Debounce::default();
        assert!(!d.fire(t0));

        d.trigger(t0);
        assert!(!d.fire(t0 + Duration::from_millis(49)));
        assert!(d.fire(t0 + Duration::from_millis(50)));
        assert!(!d.fire(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn retrigger_extends_the_deadline() {
        let t0 = Instant::now();
        let mut d = Debounce::new(Duration::from_millis(50));
        d.trigger(t0);
        d.trigger(t0 + Duration::from_millis(40));
        assert!(!d.fire(t0 + Duration::from_millis(60)));
        assert_eq!(
            d.remaining(t0 + Duration::from_millis(60)),
            Some(Duration::from_millis(30))
        );
        assert!(d.fire(t0 + Duration::from_millis(90)));
    }

    #[test]
    fn flush_clears_pending() {
        let mut d = Debounce::default();
        assert!(!d.flush());
        d.trigger(Instant::now());
        assert!(d.is_pending());
        assert!(d.flush());
        assert!(!d.is_pending());
    }
}
