use serde::Serialize;
use tracing::{debug, info};

use super::mirror::Mirror;
use super::scheduler::SaveStatus;
use crate::document::GraphSnapshot;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DropReason {
    Unsynced,
    Saving,
    Gesture,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ReconcileOutcome {
    Merged { nodes: usize, edges: usize },
    Dropped { reason: DropReason },
}

impl ReconcileOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, ReconcileOutcome::Merged { .. })
    }
}

/// Merge a store snapshot into the mirror unless local state must win.
///
/// A blocked snapshot is dropped, not queued. The next store event after
/// the local save lands carries the newer state.
pub fn reconcile(
    mirror: &mut Mirror,
    remote: &GraphSnapshot,
    status: SaveStatus,
    gesture_blocked: bool,
) -> ReconcileOutcome {
    let reason = if status.has_pending_edits() {
        Some(match status {
            SaveStatus::Saving => DropReason::Saving,
            _ => DropReason::Unsynced,
        })
    } else if gesture_blocked {
        Some(DropReason::Gesture)
    } else {
        None
    };

    if let Some(reason) = reason {
        info!("Dropping remote snapshot: {:?}", reason);
        return ReconcileOutcome::Dropped { reason };
    }

    mirror.merge_preserving_selection(remote);
    debug!(
        "Merged remote snapshot with {} nodes and {} edges",
        remote.nodes.len(),
        remote.edges.len()
    );
    ReconcileOutcome::Merged {
        nodes: remote.nodes.len(),
        edges: remote.edges.len(),
    }
}
