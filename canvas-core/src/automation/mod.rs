//! Automation orchestration for node data
//!
//! A trigger runs one agent pipeline in a background task: the record moves
//! to `working`, its `input` dependencies are loaded and handed to an
//! [`AgentRunner`] together with the input schema registered for the node
//! type, and the run settles as `idle` or `error`. Tools report their steps
//! through a [`ProgressReporter`] that is disabled outside automation runs.

pub mod progress;
pub mod prompt;
pub mod registry;
pub mod runner;
pub mod service;
pub mod tools;

pub use progress::ProgressReporter;
pub use prompt::build_prompt;
pub use registry::InputSchemaRegistry;
pub use runner::{
    AgentOutcome, AgentRequest, AgentRunner, AutomationTool, ToolCall, ToolContext,
    UnconfiguredRunner,
};
pub use service::{AutomationService, RunState, RunStatus};
pub use tools::{UpdateNodeFieldsTool, UPDATE_NODE_FIELDS};
