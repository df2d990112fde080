//! Per-activation timer manager.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::{interval, sleep};

#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("timer '{0}' already registered")]
    DuplicateName(String),
    #[error("timer manager has been disposed")]
    Disposed,
    #[error("timer '{0}' not found")]
    NotFound(String),
}

struct RunningTimer {
    cancel: oneshot::Sender<()>,
}

/// Named, per-activation timers. Disposing the manager (on deactivation)
/// stops every outstanding timer; after `dispose()` every operation
/// raises `Disposed`.
pub struct TimerManager {
    timers: Mutex<HashMap<String, RunningTimer>>,
    disposed: Mutex<bool>,
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
            disposed: Mutex::new(false),
        }
    }

    fn ensure_not_disposed(&self) -> Result<(), TimerError> {
        if *self.disposed.lock() {
            Err(TimerError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Register a named timer. `period` is `None` for a one-shot timer
    /// that fires once after `due_time`. `callback` is invoked on the
    /// tokio runtime; registering a name already present raises
    /// `DuplicateName`.
    pub fn register<F, Fut>(
        self: &Arc<Self>,
        name: impl Into<String>,
        due_time: Duration,
        period: Option<Duration>,
        mut callback: F,
    ) -> Result<(), TimerError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.ensure_not_disposed()?;
        let name = name.into();
        let mut timers = self.timers.lock();
        if timers.contains_key(&name) {
            return Err(TimerError::DuplicateName(name));
        }
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut cancel_rx => return,
                _ = sleep(due_time) => {}
            }
            callback().await;
            let Some(period) = period else { return };
            let mut ticker = interval(period);
            ticker.tick().await; // consume the immediate first tick
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => return,
                    _ = ticker.tick() => {}
                }
                callback().await;
            }
        });
        timers.insert(name, RunningTimer { cancel: cancel_tx });
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> Result<(), TimerError> {
        self.ensure_not_disposed()?;
        let mut timers = self.timers.lock();
        let timer = timers.remove(name).ok_or_else(|| TimerError::NotFound(name.to_string()))?;
        let _ = timer.cancel.send(());
        Ok(())
    }

    pub fn active_timer_count(&self) -> usize {
        self.timers.lock().len()
    }

    /// Stop every outstanding timer and mark the manager permanently
    /// disposed.
    pub fn dispose(&self) {
        let mut disposed = self.disposed.lock();
        if *disposed {
            return;
        }
        *disposed = true;
        for (_, timer) in self.timers.lock().drain() {
            let _ = timer.cancel.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let manager = Arc::new(TimerManager::new());
        manager
            .register("ping", Duration::from_secs(60), None, || async {})
            .unwrap();
        let err = manager
            .register("ping", Duration::from_secs(60), None, || async {})
            .unwrap_err();
        assert!(matches!(err, TimerError::DuplicateName(_)));
    }

    #[tokio::test]
    async fn unregister_removes_timer() {
        let manager = Arc::new(TimerManager::new());
        manager
            .register("ping", Duration::from_secs(60), None, || async {})
            .unwrap();
        manager.unregister("ping").unwrap();
        assert_eq!(manager.active_timer_count(), 0);
    }

    #[test]
    fn operations_after_dispose_raise_disposed() {
        let manager = Arc::new(TimerManager::new());
        manager.dispose();
        let err = manager
            .register("ping", Duration::from_secs(1), None, || async {})
            .unwrap_err();
        assert!(matches!(err, TimerError::Disposed));
        assert!(matches!(manager.unregister("ping"), Err(TimerError::Disposed)));
    }

    #[tokio::test]
    async fn one_shot_timer_fires_once() {
        let manager = Arc::new(TimerManager::new());
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();
        manager
            .register("once", Duration::from_millis(5), None, move || {
                let count = count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
