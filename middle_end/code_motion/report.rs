//! Human readable and JSON summaries of a finished session.

use std::collections::BTreeSet as Set;
use std::fmt;

use serde::Serialize;

use super::{AnalysisError, CodeMotion, Placement};
use crate::middle_end::analysis::{Analysis, Seeding, Solution};
use crate::middle_end::flow_graph::NodeId;

/// The real-node listing of one result vector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VectorReport {
    pub analysis: Analysis,
    pub holding: Set<NodeId>,
    #[serde(skip_serializing_if = "Set::is_empty")]
    pub unknown: Set<NodeId>,
}

impl From<&Solution> for VectorReport {
    fn from(solution: &Solution) -> Self {
        VectorReport {
            analysis: solution.analysis(),
            holding: solution.holding(),
            unknown: solution.unknown(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub seeding: Seeding,
    pub real_nodes: usize,
    pub used: Set<NodeId>,
    pub killed: Set<NodeId>,
    pub vectors: Vec<VectorReport>,
    pub placement: Placement,
}

impl Report {
    /// Summarizes a session whose phases have all run.
    pub fn new(session: &CodeMotion<'_>) -> Result<Self, AnalysisError> {
        let graph = session.graph();
        let results = session.results()?;
        let real = |set: Set<NodeId>| -> Set<NodeId> {
            set.into_iter().filter(|n| graph.is_real(*n)).collect()
        };

        Ok(Report {
            seeding: session.options().seeding,
            real_nodes: graph.real_count(),
            used: real(graph.used_nodes()),
            killed: real(graph.killed_nodes()),
            vectors: [
                results.down_safety,
                results.earliest,
                results.delay,
                results.latest,
                results.isolated,
            ]
            .into_iter()
            .map(VectorReport::from)
            .collect(),
            placement: session.placement()?,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn list(set: &Set<NodeId>) -> String {
    if set.is_empty() {
        return "none".to_owned();
    }
    set.iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn braced(set: &Set<NodeId>) -> String {
    let nodes: Vec<_> = set.iter().map(|n| n.to_string()).collect();
    format!("{{{}}}", nodes.join(", "))
}

fn step_title(analysis: Analysis) -> Option<&'static str> {
    match analysis {
        Analysis::DownSafety => Some("Step 1: Compute Down-Safety"),
        Analysis::Earliest => Some("Step 2: Compute Earliestness"),
        Analysis::Delay => Some("Step 3: Compute Delay and Latest"),
        Analysis::Latest => None,
        Analysis::Isolated => Some("Step 4: Compute Isolation"),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} real nodes, used {}, killed {}, seeding {}",
            self.real_nodes,
            braced(&self.used),
            braced(&self.killed),
            self.seeding
        )?;

        for vector in &self.vectors {
            if let Some(title) = step_title(vector.analysis) {
                writeln!(f, "{title}")?;
            }
            writeln!(f, "[{} Result]: {}", vector.analysis, list(&vector.holding))?;
            if !vector.unknown.is_empty() {
                writeln!(f, "[{} Unknown]: {}", vector.analysis, list(&vector.unknown))?;
            }
        }

        writeln!(f, "Step 5: Classify Placement")?;
        writeln!(f, "[BCM]: {}", list(&self.placement.bcm))?;
        writeln!(f, "[Optimal Computation Points]: {}", list(&self.placement.optimal))?;
        writeln!(f, "[Isolated Computation]: {}", list(&self.placement.isolated))?;
        writeln!(f, "[Redundant Occurrence]: {}", list(&self.placement.redundant))
    }
}
