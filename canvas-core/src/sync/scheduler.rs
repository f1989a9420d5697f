use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::document::GraphSnapshot;
use crate::errors::{CoreResult, SyncError, SyncResult};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Unsynced,
    Saving,
    Saved,
    Error,
}

impl SaveStatus {
    /// Local edits exist that the store has not confirmed yet.
    pub fn has_pending_edits(&self) -> bool {
        matches!(self, SaveStatus::Unsynced | SaveStatus::Saving)
    }
}

/// Destination of scheduled graph saves.
#[async_trait]
pub trait CanvasWriter: Send + Sync {
    async fn save_graph(&self, canvas_id: &str, snapshot: GraphSnapshot) -> CoreResult<()>;
}

enum SchedulerCommand {
    /// `seq` is the edit counter value this snapshot brings the store up to.
    Schedule { snapshot: GraphSnapshot, seq: u64 },
    Flush {
        response: oneshot::Sender<SaveStatus>,
    },
    Cancel,
    Shutdown {
        response: oneshot::Sender<()>,
    },
}

enum Phase {
    Idle,
    Pending {
        deadline: Instant,
        snapshot: GraphSnapshot,
        seq: u64,
    },
}

/// Debounced writer of one canvas's graph, run as a single actor task.
///
/// Each `schedule` restarts the debounce window with the newest snapshot;
/// only that snapshot is written when the window elapses. A save runs to
/// completion before further commands are handled.
///
/// Every status change happens inside the watch channel's lock together
/// with the edit counter check, so `saved` is never published while an edit
/// newer than the saved snapshot exists.
pub struct PersistenceScheduler {
    canvas_id: String,
    writer: Arc<dyn CanvasWriter>,
    debounce: Duration,
    phase: Phase,
    command_rx: mpsc::UnboundedReceiver<SchedulerCommand>,
    status: Arc<watch::Sender<SaveStatus>>,
    edits: Arc<AtomicU64>,
    scheduled_seq: u64,
}

impl PersistenceScheduler {
    pub fn spawn(
        canvas_id: impl Into<String>,
        writer: Arc<dyn CanvasWriter>,
        debounce: Duration,
    ) -> SchedulerHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        let status = Arc::new(status_tx);
        let edits = Arc::new(AtomicU64::new(0));

        let scheduler = Self {
            canvas_id: canvas_id.into(),
            writer,
            debounce,
            phase: Phase::Idle,
            command_rx,
            status: status.clone(),
            edits: edits.clone(),
            scheduled_seq: 0,
        };
        debug!("Persistence scheduler spawned for canvas {}", scheduler.canvas_id);

        tokio::spawn(async move {
            scheduler.run().await;
        });

        SchedulerHandle {
            command_tx,
            status,
            status_rx,
            edits,
        }
    }

    async fn run(mut self) {
        loop {
            let deadline = match &self.phase {
                Phase::Pending { deadline, .. } => Some(*deadline),
                Phase::Idle => None,
            };

            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(SchedulerCommand::Schedule { snapshot, seq }) => {
                        self.scheduled_seq = seq;
                        self.phase = Phase::Pending {
                            deadline: Instant::now() + self.debounce,
                            snapshot,
                            seq,
                        };
                    }
                    Some(SchedulerCommand::Flush { response }) => {
                        self.save_pending().await;
                        let _ = response.send(*self.status.borrow());
                    }
                    Some(SchedulerCommand::Cancel) => self.cancel_pending(),
                    Some(SchedulerCommand::Shutdown { response }) => {
                        self.cancel_pending();
                        let _ = response.send(());
                        break;
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.save_pending().await;
                }
            }
        }

        debug!("Persistence scheduler for canvas {} stopped", self.canvas_id);
    }

    fn cancel_pending(&mut self) {
        if matches!(self.phase, Phase::Pending { .. }) {
            info!("Discarding pending save for canvas {}", self.canvas_id);
        }
        self.phase = Phase::Idle;
        // An edit whose command is still queued keeps the status unsynced.
        let edits = &self.edits;
        let scheduled_seq = self.scheduled_seq;
        self.status.send_modify(|status| {
            if edits.load(Ordering::SeqCst) == scheduled_seq {
                *status = SaveStatus::Idle;
            }
        });
    }

    async fn save_pending(&mut self) {
        let Phase::Pending { snapshot, seq, .. } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return;
        };

        let edits = &self.edits;
        self.status.send_modify(|status| {
            if edits.load(Ordering::SeqCst) == seq {
                *status = SaveStatus::Saving;
            }
        });

        let outcome = self.writer.save_graph(&self.canvas_id, snapshot).await;
        if let Err(err) = &outcome {
            warn!("Saving canvas {} failed: {}", self.canvas_id, err);
        }

        self.status.send_modify(|status| {
            *status = if edits.load(Ordering::SeqCst) != seq {
                SaveStatus::Unsynced
            } else if outcome.is_ok() {
                SaveStatus::Saved
            } else {
                SaveStatus::Error
            };
        });
        debug!("Canvas {} save finished as {:?}", self.canvas_id, *self.status.borrow());
    }
}

/// Cloneable handle to a running [`PersistenceScheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::UnboundedSender<SchedulerCommand>,
    status: Arc<watch::Sender<SaveStatus>>,
    status_rx: watch::Receiver<SaveStatus>,
    edits: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Queue `snapshot` for a debounced save. The status turns `unsynced`
    /// immediately.
    pub fn schedule(&self, snapshot: GraphSnapshot) -> SyncResult<()> {
        let mut seq = 0;
        self.status.send_modify(|status| {
            seq = self.edits.fetch_add(1, Ordering::SeqCst) + 1;
            *status = SaveStatus::Unsynced;
        });
        self.command_tx
            .send(SchedulerCommand::Schedule { snapshot, seq })
            .map_err(|_| SyncError::SchedulerStopped)
    }

    /// Save any pending snapshot now and report the resulting status.
    pub async fn flush(&self) -> SyncResult<SaveStatus> {
        let (response, rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::Flush { response })
            .map_err(|_| SyncError::SchedulerStopped)?;
        rx.await.map_err(|_| SyncError::SchedulerStopped)
    }

    /// Drop the pending save without writing it.
    pub fn cancel(&self) -> SyncResult<()> {
        self.command_tx
            .send(SchedulerCommand::Cancel)
            .map_err(|_| SyncError::SchedulerStopped)
    }

    pub async fn shutdown(&self) -> SyncResult<()> {
        let (response, rx) = oneshot::channel();
        self.command_tx
            .send(SchedulerCommand::Shutdown { response })
            .map_err(|_| SyncError::SchedulerStopped)?;
        rx.await.map_err(|_| SyncError::SchedulerStopped)
    }

    pub fn status(&self) -> SaveStatus {
        *self.status_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status_rx.clone()
    }
}
