//! Update engine
//!
//! Ties the pieces together: notifications pass the write marker, get
//! debounced per document, and once a document is quiet the updater
//! re-reads it and writes the stamp.

use crate::debounce::DebounceScheduler;
use crate::marker::WriteMarker;
use fm_core::{
    Clock, DocumentHost, Prepared, Result, SystemClock, UpdateOutcome, Updater,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

const DRAIN_POLL: Duration = Duration::from_millis(100);

pub struct Engine<H, C = SystemClock> {
    updater: Arc<Updater<H, C>>,
    marker: Arc<WriteMarker>,
    scheduler: DebounceScheduler<String>,
}

impl<H, C> Engine<H, C>
where
    H: DocumentHost + 'static,
    C: Clock + 'static,
{
    /// Engine with the updater's debounce timeout and the default echo window
    pub fn new(updater: Updater<H, C>) -> Self {
        let delay = updater.settings().debounce();
        Self {
            updater: Arc::new(updater),
            marker: Arc::new(WriteMarker::default()),
            scheduler: DebounceScheduler::new(delay),
        }
    }

    pub fn with_echo_window(mut self, echo_window: Duration) -> Self {
        self.marker = Arc::new(WriteMarker::new(echo_window));
        self
    }

    pub fn updater(&self) -> &Updater<H, C> {
        &self.updater
    }

    pub fn marker(&self) -> &WriteMarker {
        &self.marker
    }

    /// A document was edited
    ///
    /// Returns immediately; the update runs once the document has been quiet
    /// for the debounce timeout. The echo of the engine's own write is
    /// ignored.
    pub fn notify(&self, id: &str) {
        if self.marker.absorb(id) {
            trace!("Ignoring echo of own write to {}", id);
            return;
        }

        let updater = Arc::clone(&self.updater);
        let marker = Arc::clone(&self.marker);
        let key = id.to_string();
        self.scheduler.notify(id.to_string(), move || {
            run_quiescent(&updater, &marker, &key);
        });
    }

    /// Run the update for a document that has stopped changing
    pub fn on_quiescent_edit(&self, id: &str) -> Option<UpdateOutcome> {
        run_quiescent(&self.updater, &self.marker, id)
    }

    /// Number of documents waiting for their debounce timer
    pub fn pending(&self) -> usize {
        self.scheduler.pending_count()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.scheduler.is_pending(&id.to_string())
    }

    /// Consume identities until `shutdown` resolves
    ///
    /// When the channel closes first, pending updates are allowed to fire
    /// before returning.
    pub async fn run<F>(&self, mut rx: UnboundedReceiver<String>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
                next = rx.recv() => match next {
                    Some(id) => self.notify(&id),
                    None => {
                        debug!("Event source closed, {} update(s) pending", self.pending());
                        while self.pending() > 0 {
                            tokio::select! {
                                _ = &mut shutdown => break,
                                _ = tokio::time::sleep(DRAIN_POLL) => {}
                            }
                        }
                        break;
                    }
                },
            }
        }
        self.shutdown();
    }

    /// Drop every pending update
    pub fn shutdown(&self) {
        let dropped = self.scheduler.cancel_all();
        if dropped > 0 {
            info!("Dropped {} pending update(s)", dropped);
        }
    }
}

fn run_quiescent<H: DocumentHost, C: Clock>(
    updater: &Updater<H, C>,
    marker: &WriteMarker,
    id: &str,
) -> Option<UpdateOutcome> {
    match update(updater, marker, id) {
        Ok(outcome) => {
            if let UpdateOutcome::Skipped(reason) = &outcome {
                debug!("Left {} unchanged: {}", id, reason);
            }
            Some(outcome)
        }
        Err(e) => {
            warn!("Failed to update {}: {}", id, e);
            None
        }
    }
}

fn update<H: DocumentHost, C: Clock>(
    updater: &Updater<H, C>,
    marker: &WriteMarker,
    id: &str,
) -> Result<UpdateOutcome> {
    let plan = match updater.prepare(id)? {
        Prepared::Skip(reason) => return Ok(UpdateOutcome::Skipped(reason)),
        Prepared::Write(plan) => plan,
    };

    marker.begin_write(id);
    match updater.commit(id, &plan) {
        Ok(()) => {
            marker.finish_write(id);
            Ok(UpdateOutcome::Written(plan.value))
        }
        Err(e) => {
            marker.abort_write(id);
            Err(e)
        }
    }
}
