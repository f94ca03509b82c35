use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Wall-clock time in unix milliseconds, as persisted in schedules.
pub trait Clock: Send + Sync {
    fn now_unix_ms(&self) -> u64;
}

/// Unix time derived from tokio's monotonic clock.
///
/// Reads the system time once and then follows `tokio::time::Instant`, so it
/// never jumps backwards and follows paused or advanced time in tests.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor_unix_ms: u64,
    anchor: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self::anchored_at(now)
    }

    /// A clock that reads `unix_ms` right now.
    pub fn anchored_at(unix_ms: u64) -> Self {
        Self {
            anchor_unix_ms: unix_ms,
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_unix_ms(&self) -> u64 {
        self.anchor_unix_ms + self.anchor.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_tokio_time() {
        let clock = MonotonicClock::anchored_at(1_000);
        assert_eq!(clock.now_unix_ms(), 1_000);

        tokio::time::advance(Duration::from_millis(2_500)).await;
        assert_eq!(clock.now_unix_ms(), 3_500);
    }
}
