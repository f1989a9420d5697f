//! Automation pipeline error types
//!
//! Every variant here is caught at the trigger boundary and turned into
//! `status = error` on the node data record. None of them reach the caller of
//! `trigger_automation`.
//!
//! # Examples
//!
//! ```rust
//! use canvas::errors::AutomationError;
//!
//! let err = AutomationError::SchemaMissing("textNote".to_string());
//! assert!(err.is_validation_error());
//! assert_eq!(err.error_code(), "VALIDATION_FAILED");
//! ```

use thiserror::Error;

use super::{CoreError, CoreErrorKind};

/// Errors raised while running an automation pipeline
#[derive(Error, Debug)]
pub enum AutomationError {
    /// No input schema is registered for the node data type
    #[error("No automation input schema registered for node type '{0}'")]
    SchemaMissing(String),

    /// Node data record referenced by the run is missing
    #[error("Node data '{0}' not found")]
    NodeDataNotFound(String),

    /// A tool failed inside the pipeline
    #[error("Tool '{tool}' failed: {reason}")]
    ToolExecution {
        /// Tool name as exposed to the agent
        tool: String,
        /// Reason for failure
        reason: String,
    },

    /// The agent runtime itself failed
    #[error("Agent run failed: {0}")]
    Runner(String),

    /// Store access failed while preparing or settling the run
    #[error("Store error: {0}")]
    Store(#[from] CoreError),
}

impl AutomationError {
    pub fn tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        AutomationError::ToolExecution {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a validation error (missing schema)
    pub fn is_validation_error(&self) -> bool {
        matches!(self, AutomationError::SchemaMissing(_))
    }

    /// Get error code for API responses and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            AutomationError::SchemaMissing(_) => "VALIDATION_FAILED",
            AutomationError::NodeDataNotFound(_) => "NOT_FOUND",
            AutomationError::ToolExecution { .. } => "TOOL_EXECUTION_FAILED",
            AutomationError::Runner(_) => "EXECUTION_FAILED",
            AutomationError::Store(err) => err.kind().as_str(),
        }
    }
}

impl From<AutomationError> for CoreError {
    fn from(err: AutomationError) -> Self {
        match err {
            AutomationError::Store(inner) => inner,
            AutomationError::NodeDataNotFound(id) => CoreError::not_found("NodeData", id),
            other if other.is_validation_error() => {
                CoreError::new(CoreErrorKind::Validation, other.to_string())
            }
            other => CoreError::internal(other.to_string()),
        }
    }
}
