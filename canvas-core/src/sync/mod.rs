//! Client-side synchronization engine.
//!
//! A [`CanvasSession`] owns the optimistic [`Mirror`] of one canvas, its
//! undo/redo [`History`], gesture tracking, and a [`PersistenceScheduler`]
//! that debounces saves into the document store. Store change notifications
//! are merged back through [`reconcile`], which drops snapshots while local
//! edits are unsaved or a gesture is in flight.

pub mod changes;
pub mod gestures;
pub mod history;
pub mod mirror;
pub mod reconcile;
pub mod scheduler;
pub mod session;
pub mod writer;

pub use changes::{selection_only, EdgeChange, NodeChange};
pub use gestures::GestureTracker;
pub use history::{History, DEFAULT_HISTORY_DEPTH};
pub use mirror::Mirror;
pub use reconcile::{reconcile, DropReason, ReconcileOutcome};
pub use scheduler::{CanvasWriter, PersistenceScheduler, SaveStatus, SchedulerHandle};
pub use session::{CanvasSession, SessionUpdate};
pub use writer::{open_session, ContextWriter};
