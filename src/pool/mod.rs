//! Bounded object pooling with `rent`/`return` semantics.
//!
//! Used for envelope payload buffers and request completion bookkeeping on
//! hot paths. Returning happens through the [`Pooled`] guard's drop, so a
//! rented object can never leak out of the pool's accounting.

// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Monotonic in-process id source.
#[derive(Debug, Default)]
pub struct SequenceGenerator {
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// A bounded free list. `rent` pops a recycled object or builds a fresh
/// one; dropping the returned [`Pooled`] guard resets the object and
/// pushes it back unless the pool is already at capacity, in which case
/// the object is simply discarded.
pub struct ObjectPool<T: Send + 'static> {
    free: Mutex<VecDeque<T>>,
    capacity: usize,
    build: Box<dyn Fn() -> T + Send + Sync>,
    reset: Box<dyn Fn(&mut T) + Send + Sync>,
}

impl<T: Send + 'static> ObjectPool<T> {
    pub fn new(
        capacity: usize,
        build: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            free: Mutex::new(VecDeque::new()),
            capacity,
            build: Box::new(build),
            reset: Box::new(reset),
        })
    }

    pub fn rent(self: &Arc<Self>) -> Pooled<T> {
        let object = self.free.lock().pop_front().unwrap_or_else(|| (self.build)());
        Pooled {
            object: std::mem::ManuallyDrop::new(object),
            pool: Arc::clone(self),
        }
    }

    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    fn give_back(&self, mut object: T) {
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            (self.reset)(&mut object);
            free.push_back(object);
        }
    }
}

/// Scoped rental: derefs to the pooled object and returns it on drop.
pub struct Pooled<T: Send + 'static> {
    object: std::mem::ManuallyDrop<T>,
    pool: Arc<ObjectPool<T>>,
}

impl<T: Send + 'static> std::ops::Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

impl<T: Send + 'static> std::ops::DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.object
    }
}

impl<T: Send + 'static> Drop for Pooled<T> {
    fn drop(&mut self) {
        // Moved out exactly once; `object` is never touched after this.
        let object = unsafe { std::mem::ManuallyDrop::take(&mut self.object) };
        self.pool.give_back(object);
    }
}
