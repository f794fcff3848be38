//! Per-document debouncing
//!
//! Each key owns at most one pending timer. A new notification aborts the
//! pending timer and starts a fresh one, so the action runs once after the
//! key has been quiet for the whole delay.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Registry<K> {
    timers: HashMap<K, Timer>,
    next_generation: u64,
}

/// Trailing-edge debounce keyed by document identity
///
/// Timers are tokio tasks, so [`DebounceScheduler::notify`] must be called
/// from within a runtime.
pub struct DebounceScheduler<K> {
    delay: Duration,
    registry: Arc<Mutex<Registry<K>>>,
}

impl<K> DebounceScheduler<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            registry: Arc::new(Mutex::new(Registry {
                timers: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    /// Schedule `action` for `key`, replacing any pending action for it
    pub fn notify<F>(&self, key: K, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut registry = self.registry.lock();
        registry.next_generation += 1;
        let generation = registry.next_generation;

        let shared = Arc::clone(&self.registry);
        let delay = self.delay;
        let timer_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Only the timer that is still registered may fire
            {
                let mut registry = shared.lock();
                match registry.timers.get(&timer_key) {
                    Some(timer) if timer.generation == generation => {
                        registry.timers.remove(&timer_key);
                    }
                    _ => return,
                }
            }
            action();
        });

        if let Some(previous) = registry.timers.insert(key, Timer { generation, handle }) {
            trace!("Rescheduled pending timer (generation {})", previous.generation);
            previous.handle.abort();
        }
    }

    /// Drop the pending action for `key`; returns whether one existed
    pub fn cancel(&self, key: &K) -> bool {
        match self.registry.lock().timers.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.registry.lock().timers.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.lock().timers.len()
    }

    /// Cancel everything; returns how many actions were dropped
    pub fn cancel_all(&self) -> usize {
        let mut registry = self.registry.lock();
        let count = registry.timers.len();
        for (_, timer) in registry.timers.drain() {
            timer.handle.abort();
        }
        count
    }
}

impl<K> Drop for DebounceScheduler<K> {
    fn drop(&mut self) {
        for (_, timer) in self.registry.lock().timers.drain() {
            timer.handle.abort();
        }
    }
}
