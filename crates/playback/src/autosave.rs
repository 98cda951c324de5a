//! Throttle for position saves while playing

use std::time::Duration;
use tokio::time::Instant;

/// Saves while playing never happen more often than this
pub const MIN_SAVE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SaveThrottle {
    interval: Duration,
    last_save: Option<Instant>,
}

impl SaveThrottle {
    /// Intervals below [`MIN_SAVE_INTERVAL`] are raised to it
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_SAVE_INTERVAL),
            last_save: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_save {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Records a save from any trigger, restarting the interval
    pub fn mark(&mut self, now: Instant) {
        self.last_save = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_save = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_floor() {
        assert_eq!(
            SaveThrottle::new(Duration::from_millis(10)).interval(),
            MIN_SAVE_INTERVAL
        );
        assert_eq!(
            SaveThrottle::new(Duration::from_secs(5)).interval(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_due_until_first_save() {
        let throttle = SaveThrottle::new(MIN_SAVE_INTERVAL);
        assert!(throttle.is_due(Instant::now()));
    }

    #[test]
    fn test_at_most_once_per_interval() {
        let start = Instant::now();
        let mut throttle = SaveThrottle::new(MIN_SAVE_INTERVAL);
        throttle.mark(start);

        assert!(!throttle.is_due(start + Duration::from_millis(999)));
        assert!(throttle.is_due(start + Duration::from_millis(1000)));

        throttle.mark(start + Duration::from_millis(1200));
        assert!(!throttle.is_due(start + Duration::from_millis(2100)));

        throttle.reset();
        assert!(throttle.is_due(start));
    }
}
