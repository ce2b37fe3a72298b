//! Adaptive wait between reconciliation cycles.

use std::time::Duration;

/// Grows by a fixed step while nothing finishes, resets once something does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveInterval {
    initial: Duration,
    increment: Duration,
    max: Duration,
    current: Duration,
}

impl AdaptiveInterval {
    pub fn new(initial: Duration, increment: Duration, max: Duration) -> Self {
        Self {
            initial,
            increment,
            max,
            current: initial,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    pub fn grow(&mut self) {
        self.current = (self.current + self.increment).min(self.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_grows_to_cap() {
        let mut interval = AdaptiveInterval::new(secs(40), secs(10), secs(180));
        assert_eq!(interval.current(), secs(40));

        let mut seen = Vec::new();
        for _ in 0..16 {
            interval.grow();
            seen.push(interval.current().as_secs());
        }
        assert_eq!(&seen[..3], &[50, 60, 70]);
        assert_eq!(seen[13], 180);
        assert!(seen.iter().all(|s| *s <= 180));
        assert_eq!(*seen.last().unwrap(), 180);
    }

    #[test]
    fn test_reset() {
        let mut interval = AdaptiveInterval::new(secs(40), secs(10), secs(180));
        interval.grow();
        interval.grow();
        interval.reset();
        assert_eq!(interval.current(), secs(40));
    }
}
