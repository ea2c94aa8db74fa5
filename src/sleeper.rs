//! Timer source for bucket quota resets.
//!
//! A bucket holds at most one reset future at a time; dropping it cancels the timer.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A pending reset timer.
pub type ResetTimer = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Produces reset timers.
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> ResetTimer;
}

/// Production sleeper on the tokio timer wheel.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> ResetTimer {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Records every timer it hands out, then sleeps on tokio like [`TokioSleeper`].
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    armed: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations of every timer armed so far, oldest first.
    pub fn armed(&self) -> Vec<Duration> {
        self.armed.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> ResetTimer {
        self.armed.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(duration);
        TokioSleeper.sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_waits_for_the_full_duration() {
        let start = Instant::now();
        TokioSleeper.sleep(Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn recording_sleeper_tracks_armed_timers() {
        let sleeper = RecordingSleeper::new();
        let first = sleeper.sleep(Duration::from_millis(500));
        drop(first);
        sleeper.sleep(Duration::from_secs(1)).await;
        assert_eq!(sleeper.armed(), vec![Duration::from_millis(500), Duration::from_secs(1)]);
    }
}
