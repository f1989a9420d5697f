pub mod canvases;
pub mod node_data;
