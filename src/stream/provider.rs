//! `StreamProvider`: namespace/key-addressed stream registry. Each
//! `(namespace, key)` pair resolves to a single singleton
//! `StreamHandle<T>`. Type erasure at the registry boundary mirrors the
//! dispatcher's `Arc<dyn Any>` handler-slot pattern, since subscriber
//! payload types are only known at the call site.
//!
//! Streams that buffer (anything but `BackpressureMode::None`) need a
//! background task draining their queue into subscriber callbacks; this
//! provider owns spawning that task so callers never have to.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;

use super::backpressure::BackpressureMode;
use super::handle::StreamHandle;

#[derive(Default)]
pub struct StreamProvider {
    streams: DashMap<(String, String), Arc<dyn Any + Send + Sync>>,
    namespace_defaults: SyncMutex<std::collections::HashMap<String, BackpressureMode>>,
}

impl StreamProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default backpressure mode applied to streams created (not
    /// yet existing ones) under `namespace` from this point forward.
    pub fn configure_backpressure(&self, namespace: impl Into<String>, mode: BackpressureMode) {
        self.namespace_defaults.lock().insert(namespace.into(), mode);
    }

    fn default_mode_for(&self, namespace: &str) -> BackpressureMode {
        self.namespace_defaults
            .lock()
            .get(namespace)
            .copied()
            .unwrap_or(BackpressureMode::None)
    }

    /// Returns the singleton stream for `(namespace, key)`, creating it
    /// (with the namespace's configured default backpressure mode) on
    /// first access. Subsequent calls with the same type `T` return the
    /// same handle. Returns `None` if a call site requests a payload type
    /// inconsistent with the stream's first registration.
    pub fn get_stream<T: Clone + Send + Sync + 'static>(
        &self,
        namespace: impl Into<String>,
        key: impl Into<String>,
    ) -> Option<Arc<StreamHandle<T>>> {
        let namespace = namespace.into();
        let key = key.into();
        let entry = self
            .streams
            .entry((namespace.clone(), key.clone()))
            .or_insert_with(|| {
                let mode = self.default_mode_for(&namespace);
                let handle = StreamHandle::<T>::new(namespace.clone(), key.clone(), mode);
                if !matches!(mode, BackpressureMode::None) {
                    spawn_dispatch_loop(Arc::clone(&handle));
                }
                handle as Arc<dyn Any + Send + Sync>
            })
            .clone();
        entry.downcast::<StreamHandle<T>>().ok()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

fn spawn_dispatch_loop<T: Clone + Send + Sync + 'static>(handle: Arc<StreamHandle<T>>) {
    tokio::spawn(async move {
        loop {
            while handle.drain_one().await {}
            handle.wait_for_item().await;
        }
    });
}
