use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::config::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::types::BenchError;

/// Waits for a download artifact to appear on disk.
///
/// Existence is the only completion signal: a zero-byte or still-growing file
/// counts as done. Filesystem change events on the parent directory wake the
/// wait early; the poll interval bounds the wait when no event arrives or the
/// platform watcher could not be set up.
#[derive(Debug, Clone)]
pub struct CompletionWatcher {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for CompletionWatcher {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}

impl CompletionWatcher {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve once `path` exists, or fail with `Timeout` after the
    /// configured window.
    pub async fn wait_for(&self, path: &Path) -> Result<(), BenchError> {
        let start = Instant::now();
        let wake = Arc::new(Notify::new());
        let _subscription = subscribe(path, wake.clone());

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                tracing::debug!(
                    path = %path.display(),
                    waited_ms = start.elapsed().as_millis() as u64,
                    "artifact appeared"
                );
                return Ok(());
            }
            if start.elapsed() > self.timeout {
                return Err(BenchError::Timeout {
                    path: path.display().to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = wake.notified() => {}
            }
        }
    }
}

/// Watch the directory that will contain `path`. Returns `None` when the
/// directory does not exist yet or the platform watcher is unavailable; the
/// caller then relies on polling alone.
fn subscribe(path: &Path, wake: Arc<Notify>) -> Option<RecommendedWatcher> {
    let dir: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            wake.notify_one();
        }
    })
    .map_err(|e| tracing::debug!(error = %e, "fs watcher unavailable; polling only"))
    .ok()?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot watch directory; polling only")
        })
        .ok()?;

    Some(watcher)
}
