//! Delayability, and the `Latest` placement derived from it.
//!
//! `Delay` is forward and starts at `1` everywhere but the entry, so values
//! only fall:
//!
//! ```text
//! Delay(n)     = ⋀_{p ∈ pred(n)} (¬Used(p) ∧ Delay(p)) ∨ (DownSafety(n) ∧ Earliest(n))
//! Delay(entry) = 0
//! ```
//!
//! Once `Delay` has converged, `Latest` is a single pointwise pass over the
//! real nodes:
//!
//! ```text
//! Latest(n) = Delay(n) ∧ (Used(n) ∨ ¬⋀_{s ∈ succ(n)} Delay(s))
//! ```

use super::*;

// SECTION: analysis interface

pub fn analyze(
    graph: &FlowGraph,
    down_safety: &Solution,
    earliest: &Solution,
    seeding: Seeding,
    observer: &mut dyn UpdateObserver,
) -> Solution {
    let equation = Delay {
        graph,
        down_safety,
        earliest,
    };
    solve(graph, &equation, seeding, observer)
}

/// Derives `Latest` from a converged `Delay`.  Entry and exit are never latest.
pub fn latest(graph: &FlowGraph, delay: &Solution) -> Solution {
    let mut facts = vec![Fact::False; graph.len()];
    for n in graph.real_nodes() {
        let all_succs_delayed = graph.succ(n).all(|s| delay.holds(s));
        let is_latest = delay.holds(n) && (graph.is_used(n) || !all_succs_delayed);
        facts[n.index()] = Fact::from(is_latest);
    }
    Solution::new(Analysis::Latest, facts)
}

// SECTION: analysis implementation

pub struct Delay<'a> {
    pub graph: &'a FlowGraph,
    pub down_safety: &'a Solution,
    pub earliest: &'a Solution,
}

impl BitEquation for Delay<'_> {
    const ANALYSIS: Analysis = Analysis::Delay;
    const DIRECTION: Direction = Direction::Forward;
    const FIXPOINT: Fixpoint = Fixpoint::Greatest;
    const MEET: Meet = Meet::All;

    fn boundary(&self) -> bool {
        false
    }

    fn term(&self, pred: NodeId, value: bool) -> bool {
        !self.graph.is_used(pred) && value
    }

    fn apply(&self, node: NodeId, met: bool) -> bool {
        met || (self.down_safety.holds(node) && self.earliest.holds(node))
    }
}
