use std::time::Duration;

use loyalty::app::EngineSettings;

/// Engine settings scaled down for tests: short poll interval and retry wait.
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        poll_workers: 4,
        reconcile_workers: 2,
        queue_capacity: 64,
        poll_interval: Duration::from_millis(5),
        submit_timeout: Duration::from_millis(200),
        persist_attempts: 3,
        persist_retry: Duration::from_millis(5),
    }
}

/// Re-check `condition` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
