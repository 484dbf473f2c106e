//! Earliestness: the points where an insertion cannot move any further up.
//!
//! Forwards, least fixpoint, over the frozen down-safety result:
//!
//! ```text
//! Earliest(n)     = ⋁_{p ∈ pred(n)} ((¬DownSafety(p) ∧ Earliest(p)) ∨ Killed(p))
//! Earliest(entry) = 1
//! ```

use super::*;

// SECTION: analysis interface

pub fn analyze(
    graph: &FlowGraph,
    down_safety: &Solution,
    seeding: Seeding,
    observer: &mut dyn UpdateObserver,
) -> Solution {
    solve(graph, &Earliest { graph, down_safety }, seeding, observer)
}

// SECTION: analysis implementation

pub struct Earliest<'a> {
    pub graph: &'a FlowGraph,
    pub down_safety: &'a Solution,
}

impl BitEquation for Earliest<'_> {
    const ANALYSIS: Analysis = Analysis::Earliest;
    const DIRECTION: Direction = Direction::Forward;
    const FIXPOINT: Fixpoint = Fixpoint::Least;
    const MEET: Meet = Meet::Any;

    fn boundary(&self) -> bool {
        true
    }

    fn term(&self, pred: NodeId, value: bool) -> bool {
        (!self.down_safety.holds(pred) && value) || self.graph.is_killed(pred)
    }

    fn apply(&self, _node: NodeId, met: bool) -> bool {
        met
    }
}
