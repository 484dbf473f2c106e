//! Isolation: placement points whose value would only be used once.
//!
//! ```text
//! Isolated(n)    = ⋀_{s ∈ succ(n)} (Latest(s) ∨ (¬Used(s) ∧ Isolated(s)))
//! Isolated(exit) = 1
//! ```
//!
//! Pinning the exit to `1` and starting every other node at `1` yields the
//! greatest solution, i.e. the largest set of isolated nodes.

use super::*;

// SECTION: analysis interface

pub fn analyze(
    graph: &FlowGraph,
    latest: &Solution,
    seeding: Seeding,
    observer: &mut dyn UpdateObserver,
) -> Solution {
    solve(graph, &Isolated { graph, latest }, seeding, observer)
}

// SECTION: analysis implementation

pub struct Isolated<'a> {
    pub graph: &'a FlowGraph,
    pub latest: &'a Solution,
}

impl BitEquation for Isolated<'_> {
    const ANALYSIS: Analysis = Analysis::Isolated;
    const DIRECTION: Direction = Direction::Backward;
    const FIXPOINT: Fixpoint = Fixpoint::Greatest;
    const MEET: Meet = Meet::All;

    fn boundary(&self) -> bool {
        true
    }

    fn term(&self, succ: NodeId, value: bool) -> bool {
        self.latest.holds(succ) || (!self.graph.is_used(succ) && value)
    }

    fn apply(&self, _node: NodeId, met: bool) -> bool {
        met
    }
}
