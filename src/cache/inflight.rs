//! Per-key serialization of cache generation
//!
//! Two requests for the same not-yet-cached file would otherwise both run
//! the transform. `InFlight` hands out one mutex per encoded cache path so
//! the second request waits and then finds the file already written.
//! Entries are dropped as soon as nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Slots = HashMap<String, Arc<Mutex<()>>>;

/// Map of in-flight generation keys
#[derive(Debug, Default)]
pub struct InFlight {
    slots: Mutex<Slots>,
}

impl InFlight {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` while holding the lock for `key`
    pub fn run<T>(&self, key: &str, work: impl FnOnce() -> T) -> T {
        let slot = Slot::acquire(self, key);
        let _held = slot.lock();
        work()
    }

    /// Number of keys currently held or awaited
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Whether no key is held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        // The map stays consistent even if a holder panicked
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Slot<'a> {
    owner: &'a InFlight,
    key: String,
    lock: Option<Arc<Mutex<()>>>,
}

impl<'a> Slot<'a> {
    fn acquire(owner: &'a InFlight, key: &str) -> Self {
        let lock = owner.slots().entry(key.to_string()).or_default().clone();
        Self {
            owner,
            key: key.to_string(),
            lock: Some(lock),
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        let mut slots = self.owner.slots();
        drop(self.lock.take());

        let idle = slots
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn run_returns_work_result() {
        let inflight = InFlight::new();
        assert_eq!(inflight.run("/a@x@1.png", || 42), 42);
        assert!(inflight.is_empty());
    }

    #[test]
    fn same_key_is_serialized() {
        let inflight = InFlight::new();
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    inflight.run("/a@x@1.png", || {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        active.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[test]
    fn different_keys_do_not_block() {
        let inflight = InFlight::new();
        let outer = inflight.run("/a@x@1.png", || inflight.run("/b@x@1.png", || inflight.len()));
        assert_eq!(outer, 2);
        assert!(inflight.is_empty());
    }
}
