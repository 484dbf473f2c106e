//! Reading flow graphs from their textual description.

pub mod parser;


pub use parser::{parse_graph, GraphParseError};
