//! Down-safety (anticipability) of the candidate expression.
//!
//! A node is down-safe when computing the expression there is guaranteed to be
//! used, without an intervening kill, on every path to the exit.  Backwards,
//! greatest fixpoint:
//!
//! ```text
//! DownSafety(n)    = (¬Killed(n) ∧ ⋀_{s ∈ succ(n)} DownSafety(s)) ∨ Used(n)
//! DownSafety(exit) = 0
//! ```

use super::*;

// SECTION: analysis interface

pub fn analyze(
    graph: &FlowGraph,
    seeding: Seeding,
    observer: &mut dyn UpdateObserver,
) -> Solution {
    solve(graph, &DownSafety { graph }, seeding, observer)
}

// SECTION: analysis implementation

pub struct DownSafety<'a> {
    pub graph: &'a FlowGraph,
}

impl BitEquation for DownSafety<'_> {
    const ANALYSIS: Analysis = Analysis::DownSafety;
    const DIRECTION: Direction = Direction::Backward;
    const FIXPOINT: Fixpoint = Fixpoint::Greatest;
    const MEET: Meet = Meet::All;

    fn boundary(&self) -> bool {
        false
    }

    fn term(&self, _source: NodeId, value: bool) -> bool {
        value
    }

    fn apply(&self, node: NodeId, met: bool) -> bool {
        (!self.graph.is_killed(node) && met) || self.graph.is_used(node)
    }
}
