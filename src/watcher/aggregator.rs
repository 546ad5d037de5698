//! Batch reduction: pick the one change worth acting on.
//!
//! A poll tick can deliver many coalesced events for the watched folder.
//! Relaunching the viewer is disruptive, so each batch reduces to at most
//! one event: the most recently modified file that was created or modified.

use super::event::ChangeEvent;

/// Select the single most relevant event from a batch.
///
/// Events whose action is not Created or Modified are discarded. Among the
/// rest, the greatest `modified_at` wins; on equal timestamps the event
/// appended later wins. Returns `None` for an empty or fully filtered
/// batch, which is a normal no-op.
pub fn select(batch: &[ChangeEvent]) -> Option<&ChangeEvent> {
    batch
        .iter()
        .filter(|event| event.action.triggers_relaunch())
        // max_by keeps the last of equal elements, giving last-wins ties
        .max_by(|a, b| a.modified_at.cmp(&b.modified_at))
}
