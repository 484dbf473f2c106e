//! Turns the converged vectors into placement decisions.

use std::collections::BTreeSet as Set;

use serde::Serialize;

use super::AnalysisResults;
use crate::middle_end::flow_graph::{FlowGraph, NodeId};

/// Where the candidate expression is computed after code motion.  Every set
/// only contains real nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Busy code motion: down-safe and earliest.
    pub bcm: Set<NodeId>,
    /// Lazy code motion insertions that initialize a shared temporary.
    pub optimal: Set<NodeId>,
    /// Lazy code motion insertions left as plain computations.
    pub isolated: Set<NodeId>,
    /// Original uses replaced by a read of the temporary.
    pub redundant: Set<NodeId>,
}

impl Placement {
    pub fn classify(graph: &FlowGraph, results: &AnalysisResults<'_>) -> Self {
        let mut placement = Placement::default();

        for n in graph.real_nodes() {
            let latest = results.latest.holds(n);
            let isolated = results.isolated.holds(n);

            if results.down_safety.holds(n) && results.earliest.holds(n) {
                placement.bcm.insert(n);
            }
            if latest && !isolated {
                placement.optimal.insert(n);
            }
            if latest && isolated {
                placement.isolated.insert(n);
            }
            if graph.is_used(n) && !(latest && isolated) {
                placement.redundant.insert(n);
            }
        }

        placement
    }

    /// Every lazy code motion insertion point, shared or not.
    pub fn lcm(&self) -> Set<NodeId> {
        self.optimal.union(&self.isolated).copied().collect()
    }
}
