use std::time::{Duration, Instant};

/// A cancel-and-reschedule deadline. `schedule` replaces any pending
/// deadline; `fire_if_due` consumes it once `now` reaches it.
#[derive(Debug)]
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

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_the_deadline() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(100));
        debounce.schedule(start);
        assert!(debounce.is_pending());
        assert!(!debounce.fire_if_due(start + Duration::from_millis(99)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(100)));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(200)));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn reschedule_replaces_the_deadline() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(100));
        debounce.schedule(start);
        debounce.schedule(start + Duration::from_millis(80));
        assert!(!debounce.fire_if_due(start + Duration::from_millis(120)));
        assert!(debounce.fire_if_due(start + Duration::from_millis(180)));
    }

    #[test]
    fn cancel_discards_the_deadline() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::from_millis(100));
        debounce.schedule(start);
        debounce.cancel();
        assert!(!debounce.is_pending());
        assert!(!debounce.fire_if_due(start + Duration::from_secs(10)));
    }

    #[test]
    fn zero_delay_fires_on_the_next_tick() {
        let start = Instant::now();
        let mut debounce = Debounce::new(Duration::ZERO);
        debounce.schedule(start);
        assert!(debounce.fire_if_due(start));
    }
}
