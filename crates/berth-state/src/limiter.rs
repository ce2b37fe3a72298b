//! Serialize and space out calls to the scheduler.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// At most one call in flight, and at least `min_spacing` between call starts.
#[derive(Debug)]
pub struct RateLimiter {
    permits: Semaphore,
    min_spacing: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            permits: Semaphore::new(1),
            min_spacing,
            last_start: Mutex::new(None),
        }
    }

    /// Run `call` once a permit is free and the spacing has elapsed.
    pub async fn run<F: Future>(&self, call: F) -> F::Output {
        // the semaphore is never closed
        let _permit = self.permits.acquire().await.ok();

        let last = self.last_start.lock().map(|l| *l).unwrap_or(None);
        if let Some(last) = last {
            tokio::time::sleep_until(last + self.min_spacing).await;
        }
        if let Ok(mut l) = self.last_start.lock() {
            *l = Some(Instant::now());
        }

        call.await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_spacing() {
        let limiter = RateLimiter::new(Duration::from_secs(2));
        let start = Instant::now();
        limiter.run(async {}).await;
        limiter.run(async {}).await;
        limiter.run(async {}).await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_one_call_in_flight() {
        let limiter = Arc::new(RateLimiter::default());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                limiter
                    .run(async {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
