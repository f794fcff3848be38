//! Write marker
//!
//! Writing a note produces a change notification of its own. The marker
//! remembers, per document, that the engine just wrote it, so exactly one
//! following notification is recognised as that echo and ignored.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// How long a finished write keeps waiting for its echo
pub const DEFAULT_ECHO_WINDOW: Duration = Duration::from_secs(5);

/// Observable marker state of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    Idle,
    /// Mutation in progress
    PendingWrite,
    /// Mutation done, echo not seen yet
    AwaitingEcho,
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Pending,
    Awaiting(Instant),
}

/// Per-document marker registry; absent entries are `Idle`
#[derive(Debug)]
pub struct WriteMarker {
    echo_window: Duration,
    entries: DashMap<String, Entry>,
}

impl Default for WriteMarker {
    fn default() -> Self {
        Self::new(DEFAULT_ECHO_WINDOW)
    }
}

impl WriteMarker {
    pub fn new(echo_window: Duration) -> Self {
        Self {
            echo_window,
            entries: DashMap::new(),
        }
    }

    pub fn begin_write(&self, id: &str) {
        self.entries.insert(id.to_string(), Entry::Pending);
    }

    /// Mutation succeeded; wait for the echo
    ///
    /// If the echo already arrived while the write was pending, the
    /// document stays `Idle`.
    pub fn finish_write(&self, id: &str) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if matches!(*entry, Entry::Pending) {
                *entry = Entry::Awaiting(Instant::now());
            }
        }
    }

    /// Mutation failed; nothing to wait for
    pub fn abort_write(&self, id: &str) {
        self.entries.remove(id);
    }

    /// Consume the marker for a notification
    ///
    /// Returns `true` when the notification is the echo of the engine's own
    /// write and must not count as an edit. The document is `Idle`
    /// afterwards either way.
    pub fn absorb(&self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some((_, Entry::Pending)) => true,
            Some((_, Entry::Awaiting(since))) => since.elapsed() <= self.echo_window,
            None => false,
        }
    }

    pub fn state(&self, id: &str) -> MarkerState {
        match self.entries.get(id).map(|entry| *entry) {
            None => MarkerState::Idle,
            Some(Entry::Pending) => MarkerState::PendingWrite,
            Some(Entry::Awaiting(_)) => MarkerState::AwaitingEcho,
        }
    }
}
