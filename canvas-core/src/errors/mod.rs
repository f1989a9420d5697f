//! Error types for canvas-core
//!
//! - **CoreError**: kind-tagged error returned by every store and RPC operation
//! - **AutomationError**: failures inside an automation run (never rethrown to the trigger caller)
//! - **SyncError**: client-side session and scheduler failures
//!
//! # Examples
//!
//! ```rust
//! use canvas::errors::{CoreError, CoreErrorKind};
//!
//! let err = CoreError::not_found("Canvas", "c-42");
//! assert_eq!(err.kind(), CoreErrorKind::NotFound);
//! ```

pub mod automation;
pub mod core_error;
pub mod sync;

pub use automation::AutomationError;
pub use core_error::{CoreError, CoreErrorKind};
pub use sync::SyncError;

/// Result type alias for store and RPC operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type alias for automation pipeline steps
pub type AutomationResult<T> = Result<T, AutomationError>;

/// Result type alias for client sync operations
pub type SyncResult<T> = Result<T, SyncError>;
