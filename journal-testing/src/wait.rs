// Async wait helpers

use crate::RecordingListener;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Timeout used by most router tests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Poll `condition` until it holds or `timeout` elapses.
///
/// Returns whether the condition was met.
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Wait until `listener` has recorded at least `count` events
pub async fn wait_for_count(listener: &RecordingListener, count: usize, timeout: Duration) -> bool {
    wait_for(timeout, || listener.count() >= count).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_wait_for_immediate() {
        assert!(wait_for(Duration::from_millis(10), || true).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        assert!(!wait_for(Duration::from_millis(50), || false).await);
    }

    #[tokio::test]
    async fn test_wait_for_eventually() {
        let polls = Arc::new(AtomicUsize::new(0));
        let seen = polls.clone();

        let met = wait_for(DEFAULT_TIMEOUT, move || seen.fetch_add(1, Ordering::SeqCst) >= 3).await;

        assert!(met);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }
}
