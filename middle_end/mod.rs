pub mod analysis;
pub mod code_motion;
pub mod flow_graph;
