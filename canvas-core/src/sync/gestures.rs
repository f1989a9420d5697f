use std::time::Duration;

use tokio::time::Instant;

use super::changes::NodeChange;

/// Tracks drag and resize gestures from node change batches.
///
/// Dragging ends with the change that reports `dragging: false`. Resizing
/// stays blocking for a short settle window after its last in-progress
/// change so a trailing remote snapshot cannot snap the node back.
#[derive(Clone, Debug)]
pub struct GestureTracker {
    dragging: bool,
    resizing: bool,
    resize_settles_at: Option<Instant>,
    settle: Duration,
}

impl GestureTracker {
    pub fn new(settle: Duration) -> Self {
        Self {
            dragging: false,
            resizing: false,
            resize_settles_at: None,
            settle,
        }
    }

    pub fn observe(&mut self, changes: &[NodeChange], now: Instant) {
        for change in changes {
            match change {
                NodeChange::Position {
                    dragging: Some(dragging),
                    ..
                } => self.dragging = *dragging,
                NodeChange::Dimensions {
                    resizing: Some(true),
                    ..
                } => {
                    self.resizing = true;
                    self.resize_settles_at = None;
                }
                NodeChange::Dimensions {
                    resizing: Some(false),
                    ..
                } => {
                    self.resizing = false;
                    self.resize_settles_at = Some(now + self.settle);
                }
                _ => {}
            }
        }
    }

    /// A gesture is mid-flight; its intermediate states are not history.
    pub fn in_progress(&self) -> bool {
        self.dragging || self.resizing
    }

    /// Remote merges stay blocked during gestures and the resize settle window.
    pub fn blocks_reconcile(&self, now: Instant) -> bool {
        self.in_progress() || self.resize_settles_at.map_or(false, |at| now < at)
    }
}
