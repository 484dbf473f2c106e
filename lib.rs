//! Busy and Lazy Code Motion over a boolean flow graph.
//!
//! `front_end` reads textual graph descriptions, `middle_end` holds the graph,
//! the fixpoint solver, the five analyses and the placement classifier.

pub mod front_end;
pub mod middle_end;
