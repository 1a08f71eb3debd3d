use std::time::Duration;

use tokio::task::JoinHandle;

/// Periodic ticker that drives the keep-alive ping while connected. It holds
/// no socket reference; the session hands it a callback and decides what a
/// tick means. Exists only between an open and the next disconnect.
pub(crate) struct KeepAlive {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl KeepAlive {
    pub fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    /// Start ticking. Any previous ticker is fully stopped first, so two
    /// tickers can never run concurrently. The first tick fires immediately.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                on_tick();
            }
        }));
    }

    /// Cancel the ticker. No-op when not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn ticks_on_the_configured_period() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let mut keepalive = KeepAlive::new(Duration::from_secs(10));
        keepalive.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // First tick is immediate, then one per period.
        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);

        keepalive.stop();
        assert!(!keepalive.is_running());
        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn restart_replaces_the_previous_ticker() {
        let old = Arc::new(AtomicUsize::new(0));
        let new = Arc::new(AtomicUsize::new(0));
        let mut keepalive = KeepAlive::new(Duration::from_secs(10));

        let counter = old.clone();
        keepalive.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        let old_ticks = old.load(Ordering::SeqCst);

        let counter = new.clone();
        keepalive.start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(keepalive.is_running());

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        // Only the replacement ticker fires after the restart.
        assert_eq!(old.load(Ordering::SeqCst), old_ticks);
        assert!(new.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_no_op() {
        let mut keepalive = KeepAlive::new(Duration::from_secs(10));
        assert!(!keepalive.is_running());
        keepalive.stop();
        assert!(!keepalive.is_running());
    }
}
