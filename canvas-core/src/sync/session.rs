use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use super::changes::{selection_only, EdgeChange, NodeChange};
use super::gestures::GestureTracker;
use super::history::History;
use super::mirror::Mirror;
use super::reconcile::{reconcile, ReconcileOutcome};
use super::scheduler::{CanvasWriter, PersistenceScheduler, SaveStatus, SchedulerHandle};
use crate::config::CanvasConfig;
use crate::document::{Canvas, GraphSnapshot};
use crate::errors::{SyncError, SyncResult};
use crate::services::StoreEvent;

/// What a store notification did to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionUpdate {
    Reconciled(ReconcileOutcome),
    CanvasDeleted,
    Ignored,
}

/// One open canvas on the client: the mirror, its history, gesture state and
/// the scheduler that persists it.
///
/// Dispose the session when navigating away; a pending save is discarded.
pub struct CanvasSession {
    canvas_id: String,
    mirror: Mirror,
    history: History,
    gestures: GestureTracker,
    scheduler: SchedulerHandle,
}

impl CanvasSession {
    pub fn open(canvas: &Canvas, writer: Arc<dyn CanvasWriter>, config: &CanvasConfig) -> Self {
        let snapshot = canvas.snapshot();
        info!(
            "Opening session for canvas {} at version {}",
            canvas.id, canvas.version
        );

        Self {
            canvas_id: canvas.id.clone(),
            history: History::new(&snapshot, config.history_depth),
            mirror: Mirror::new(snapshot),
            gestures: GestureTracker::new(config.resize_settle()),
            scheduler: PersistenceScheduler::spawn(
                canvas.id.clone(),
                writer,
                config.save_debounce(),
            ),
        }
    }

    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.mirror.snapshot()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn save_status(&self) -> SaveStatus {
        self.scheduler.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.scheduler.subscribe()
    }

    pub fn apply_node_changes(&mut self, changes: &[NodeChange]) -> SyncResult<()> {
        self.gestures.observe(changes, Instant::now());
        self.mirror.apply_node_changes(changes);
        if selection_only(changes, NodeChange::is_selection) {
            return Ok(());
        }
        self.commit_structural_change()
    }

    pub fn apply_edge_changes(&mut self, changes: &[EdgeChange]) -> SyncResult<()> {
        self.mirror.apply_edge_changes(changes);
        if selection_only(changes, EdgeChange::is_selection) {
            return Ok(());
        }
        self.commit_structural_change()
    }

    fn commit_structural_change(&mut self) -> SyncResult<()> {
        let snapshot = self.mirror.snapshot().without_selection();
        if !self.gestures.in_progress() {
            self.history.record(&snapshot);
        }
        self.scheduler.schedule(snapshot)
    }

    /// Step back one history entry. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> SyncResult<bool> {
        match self.history.undo() {
            Some(snapshot) => self.restore(snapshot).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> SyncResult<bool> {
        match self.history.redo() {
            Some(snapshot) => self.restore(snapshot).map(|_| true),
            None => Ok(false),
        }
    }

    // Applied straight to the mirror so the restore is not recorded again.
    fn restore(&mut self, snapshot: GraphSnapshot) -> SyncResult<()> {
        debug!(
            "Restoring history entry {} of canvas {}",
            self.history.cursor(),
            self.canvas_id
        );
        self.mirror.merge_preserving_selection(&snapshot);
        self.scheduler.schedule(snapshot)
    }

    pub fn on_remote_snapshot(&mut self, canvas: &Canvas) -> SyncResult<ReconcileOutcome> {
        if canvas.id != self.canvas_id {
            return Err(SyncError::CanvasMismatch {
                expected: self.canvas_id.clone(),
                actual: canvas.id.clone(),
            });
        }

        Ok(reconcile(
            &mut self.mirror,
            &canvas.snapshot(),
            self.scheduler.status(),
            self.gestures.blocks_reconcile(Instant::now()),
        ))
    }

    pub fn on_store_event(&mut self, event: &StoreEvent) -> SyncResult<SessionUpdate> {
        match event {
            StoreEvent::CanvasChanged(canvas) => {
                self.on_remote_snapshot(canvas).map(SessionUpdate::Reconciled)
            }
            StoreEvent::CanvasDeleted { canvas_id } if *canvas_id == self.canvas_id => {
                info!("Canvas {} was deleted, discarding pending save", canvas_id);
                self.scheduler.cancel()?;
                Ok(SessionUpdate::CanvasDeleted)
            }
            _ => Ok(SessionUpdate::Ignored),
        }
    }

    /// Write any pending snapshot now.
    pub async fn flush(&self) -> SyncResult<SaveStatus> {
        self.scheduler.flush().await
    }

    pub async fn dispose(self) -> SyncResult<()> {
        debug!("Disposing session for canvas {}", self.canvas_id);
        self.scheduler.cancel()?;
        self.scheduler.shutdown().await
    }
}
