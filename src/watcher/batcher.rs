//! Per-tick coalescing of change events.
//!
//! Raw notify events arrive continuously; acting on each one would relaunch
//! the viewer for every buffered write an editor makes while saving. Events
//! accumulate here and are drained once per poll interval as one batch.

use super::event::ChangeEvent;

/// Accumulates change events between poll ticks.
///
/// Append order is preserved; the aggregator's tie-break depends on it.
#[derive(Debug, Default)]
pub struct Batcher {
    pending: Vec<ChangeEvent>,
}

impl Batcher {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Record a change event.
    pub fn record(&mut self, event: ChangeEvent) {
        self.pending.push(event);
    }

    /// Take everything recorded since the last drain, in arrival order.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Check if there are any pending changes.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
