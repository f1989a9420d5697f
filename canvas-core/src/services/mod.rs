pub mod authorization;
pub mod canvas_service;
pub mod dependency_service;
pub mod events;
pub mod node_data_service;

pub use authorization::*;
pub use canvas_service::*;
pub use dependency_service::*;
pub use events::*;
pub use node_data_service::*;
