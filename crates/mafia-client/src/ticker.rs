//! Scheduled callbacks tied to a handle's lifetime.
//!
//! A [`Ticker`] posts a message into an mpsc channel, either periodically or
//! once after a delay. Dropping the handle aborts the background task, so a
//! ticker can never outlive the view that created it.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Post `make()` every `period`, starting one period from now.
    pub fn every<T, F>(period: Duration, tx: mpsc::UnboundedSender<T>, make: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Post `make()` once after `delay`.
    pub fn once<T, F>(delay: Duration, tx: mpsc::UnboundedSender<T>, make: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(make());
        });
        Self { handle }
    }

    pub fn stop(self) {}
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let ticker = Ticker::every(Duration::from_secs(1), tx, || "tick");

        for n in 1..=3 {
            assert_eq!(rx.recv().await, Some("tick"));
            assert_eq!(start.elapsed(), Duration::from_secs(n));
        }
        ticker.stop();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_ticker_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
        let ticker = Ticker::every(Duration::from_secs(1), tx.clone(), || 1);
        let once = Ticker::once(Duration::from_millis(500), tx, || 2);
        drop(ticker);
        drop(once);

        let waited = tokio::time::timeout(Duration::from_secs(10), rx.recv()).await;
        // Both senders went away with their tasks.
        assert_eq!(waited, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn once_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _once = Ticker::once(Duration::from_millis(500), tx, || "reveal");
        assert_eq!(rx.recv().await, Some("reveal"));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(rx.recv().await, None);
    }
}
