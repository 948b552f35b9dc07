//! Injectable delay so retry and loop timing can be tested without waiting.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real delays on the tokio timer.
#[derive(Debug, Clone, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and remembers every requested delay.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sleeper_records() {
        let s = RecordingSleeper::new();
        s.sleep(Duration::from_secs(2)).await;
        s.sleep(Duration::from_millis(5)).await;
        assert_eq!(s.calls(), vec![Duration::from_secs(2), Duration::from_millis(5)]);
    }

    #[tokio::test]
    async fn test_tokio_sleeper_waits() {
        let start = std::time::Instant::now();
        TokioSleeper.sleep(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
