//! Clock and timer abstraction.
//!
//! The orchestrator never reads wall-clock time or sleeps directly; it goes
//! through a `Scheduler` so tests can pin the clock and run timers on
//! tokio's paused virtual time.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Current wall-clock reading (used for greeting selection).
    fn now(&self) -> DateTime<Utc>;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Real clock, tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Pinned wall clock, tokio timers.
///
/// Combined with `#[tokio::test(start_paused = true)]` this gives fully
/// virtual time: the greeting sees a fixed reading and sleeps advance the
/// paused runtime clock instead of waiting.
#[derive(Debug, Clone, Copy)]
pub struct FixedClockScheduler {
    now: DateTime<Utc>,
}

impl FixedClockScheduler {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

#[async_trait]
impl Scheduler for FixedClockScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_clock_sleeps_on_virtual_time() {
        let pinned = Utc.with_ymd_and_hms(2026, 1, 1, 2, 30, 0).single().unwrap();
        let scheduler = FixedClockScheduler::new(pinned);

        let started = tokio::time::Instant::now();
        scheduler.sleep(Duration::from_secs(5)).await;

        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(scheduler.now(), pinned);
    }
}
