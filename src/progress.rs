//! Progress side channel.
//!
//! The pipeline never writes to a console. It emits [`ProgressEvent`]s into a
//! [`ProgressSink`]; the sink decides what to do with them. [`LogProgress`] turns
//! them into one `tracing` line per item, [`RecordingProgress`] keeps them for
//! inspection, and any `FnMut(&ProgressEvent)` closure is a sink too.

use crate::report::{Direction, ItemState, TransferOutcome};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    BatchStarted {
        direction: Direction,
        total: usize,
    },
    ItemState {
        index: usize,
        name: String,
        state: ItemState,
    },
    ItemFinished {
        index: usize,
        total: usize,
        outcome: TransferOutcome,
    },
    BatchFinished {
        direction: Direction,
        succeeded: usize,
        total: usize,
    },
}

pub trait ProgressSink {
    fn emit(&mut self, event: &ProgressEvent);
}

impl<F: FnMut(&ProgressEvent)> ProgressSink for F {
    fn emit(&mut self, event: &ProgressEvent) {
        self(event);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&mut self, _event: &ProgressEvent) {}
}

/// One log line per finished item plus batch start/end lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::BatchStarted { direction, total } => {
                info!("{direction}: {total} items");
            }
            ProgressEvent::ItemState { .. } => {}
            ProgressEvent::ItemFinished {
                index,
                total,
                outcome,
            } => {
                let n = index + 1;
                if outcome.succeeded {
                    info!("[{n}/{total}] {} ok", outcome.name);
                } else {
                    warn!(
                        "[{n}/{total}] {} failed: {}",
                        outcome.name,
                        outcome.detail.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            ProgressEvent::BatchFinished {
                direction,
                succeeded,
                total,
            } => {
                info!("{direction}: {succeeded} of {total} items succeeded");
            }
        }
    }
}

/// Keeps every event. Clones share the same buffer, so a test can hand one clone
/// to the pipeline and read events from another.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events so far.
    ///
    /// # Panics
    ///
    /// Panics if the events mutex is poisoned.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().expect("events mutex poisoned").clone()
    }

    /// The state transitions seen for item `name`, in order.
    #[must_use]
    pub fn states_of(&self, name: &str) -> Vec<ItemState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::ItemState {
                    name: n, state, ..
                } if n == name => Some(state),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&mut self, event: &ProgressEvent) {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(event.clone());
    }
}
