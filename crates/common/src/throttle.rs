use std::time::Duration;

use tokio::time::Instant;

/// Fixed minimum spacing between outbound calls.
///
/// Unlike a backoff, the spacing never grows: every call must be at least
/// `interval` after the previous one.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_call: Option<Instant>,
}

impl Throttle {
    /// Create a throttle with the given minimum spacing.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: None,
        }
    }

    /// Change the spacing. Applies to the next `remaining`.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Time left before the next call may proceed.
    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    /// Time left at `now` before the next call may proceed.
    fn remaining_at(&self, now: Instant) -> Duration {
        match self.last_call {
            Some(last) => (last + self.interval).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// Record that a call is being made now.
    pub fn mark(&mut self) {
        self.last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_not_delayed() {
        let throttle = Throttle::new(Duration::from_secs(1));
        assert_eq!(throttle.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing_after_mark() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        throttle.mark();

        let remaining = throttle.remaining();
        assert!(remaining > Duration::from_millis(900));
        assert!(remaining <= Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(throttle.remaining() <= Duration::from_millis(400));

        tokio::time::advance(Duration::from_millis(400)).await;
        assert_eq!(throttle.remaining(), Duration::ZERO);
    }
}
