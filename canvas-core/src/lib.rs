pub mod app_context;
pub mod automation;
pub mod config;
pub mod database;
pub mod document;
pub mod errors;
pub mod services;
pub mod sync;
pub mod utils;

pub use app_context::{AppContext, MutationOutcome};
