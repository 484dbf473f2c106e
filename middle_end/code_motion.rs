//! The code motion pipeline: one session per graph, phases in strict order.
//!
//! A [`CodeMotion`] session owns the result vector of every phase.  A phase
//! can only run once the phases it reads from have converged; asking for it
//! earlier is an [`AnalysisError`] rather than a computation over empty data.
//!
//! ```text
//! DownSafety ──> Earliest ──> Delay/Latest ──> Isolated ──> Placement
//!      └─────────────────────────^                              ^
//!      └────────────────────────────────────────────────────────┘
//! ```

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::analysis::{delay, down_safety, earliest, isolated};
use super::analysis::{Analysis, Seeding, Solution, UpdateObserver};
use super::flow_graph::FlowGraph;

pub mod dot_dump;
pub mod placement;
pub mod report;

#[cfg(test)]
mod tests;

pub use dot_dump::dump_dot;
pub use placement::Placement;
pub use report::Report;

/// Knobs for a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOptions {
    pub seeding: Seeding,
}

impl SolverOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The steps of a session, in the order they must run.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    DownSafety,
    Earliest,
    Delay,
    Isolated,
    Placement,
}

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum AnalysisError {
    #[display(fmt = "{} cannot run before {} has converged", phase, requires)]
    OutOfOrder { phase: Phase, requires: Analysis },
}

impl std::error::Error for AnalysisError {}

/// All five converged vectors, borrowed from a session.
#[derive(Clone, Copy, Debug)]
pub struct AnalysisResults<'s> {
    pub down_safety: &'s Solution,
    pub earliest: &'s Solution,
    pub delay: &'s Solution,
    pub latest: &'s Solution,
    pub isolated: &'s Solution,
}

/// Per-run context: one frozen graph and the result buffers computed over it.
#[derive(Clone, Debug)]
pub struct CodeMotion<'g> {
    graph: &'g FlowGraph,
    options: SolverOptions,
    down_safety: Option<Solution>,
    earliest: Option<Solution>,
    delay: Option<Solution>,
    latest: Option<Solution>,
    isolated: Option<Solution>,
}

// the converged vector `requires`, or the ordering error for `phase`.
fn require(
    slot: &Option<Solution>,
    phase: Phase,
    requires: Analysis,
) -> Result<&Solution, AnalysisError> {
    slot.as_ref().ok_or(AnalysisError::OutOfOrder { phase, requires })
}

impl<'g> CodeMotion<'g> {
    pub fn new(graph: &'g FlowGraph) -> Self {
        Self::with_options(graph, SolverOptions::default())
    }

    pub fn with_options(graph: &'g FlowGraph, options: SolverOptions) -> Self {
        CodeMotion {
            graph,
            options,
            down_safety: None,
            earliest: None,
            delay: None,
            latest: None,
            isolated: None,
        }
    }

    pub fn graph(&self) -> &'g FlowGraph {
        self.graph
    }

    pub fn options(&self) -> SolverOptions {
        self.options
    }

    /// The converged vector of `analysis`, if its phase has run.
    pub fn solution(&self, analysis: Analysis) -> Option<&Solution> {
        match analysis {
            Analysis::DownSafety => self.down_safety.as_ref(),
            Analysis::Earliest => self.earliest.as_ref(),
            Analysis::Delay => self.delay.as_ref(),
            Analysis::Latest => self.latest.as_ref(),
            Analysis::Isolated => self.isolated.as_ref(),
        }
    }

    pub fn run_down_safety(&mut self, observer: &mut dyn UpdateObserver) -> &Solution {
        tracing::debug!("step 1: down-safety");
        let solution = down_safety::analyze(self.graph, self.options.seeding, observer);
        self.down_safety.insert(solution)
    }

    pub fn run_earliest(
        &mut self,
        observer: &mut dyn UpdateObserver,
    ) -> Result<&Solution, AnalysisError> {
        let ds = require(&self.down_safety, Phase::Earliest, Analysis::DownSafety)?;
        tracing::debug!("step 2: earliestness");
        let solution = earliest::analyze(self.graph, ds, self.options.seeding, observer);
        Ok(self.earliest.insert(solution))
    }

    /// Runs `Delay` and derives `Latest` from it; returns `Latest`.
    pub fn run_delay(
        &mut self,
        observer: &mut dyn UpdateObserver,
    ) -> Result<&Solution, AnalysisError> {
        let ds = require(&self.down_safety, Phase::Delay, Analysis::DownSafety)?;
        let earliest = require(&self.earliest, Phase::Delay, Analysis::Earliest)?;
        tracing::debug!("step 3: delay and latest");
        let solution = delay::analyze(self.graph, ds, earliest, self.options.seeding, observer);
        let latest = delay::latest(self.graph, &solution);
        self.delay = Some(solution);
        Ok(self.latest.insert(latest))
    }

    pub fn run_isolated(
        &mut self,
        observer: &mut dyn UpdateObserver,
    ) -> Result<&Solution, AnalysisError> {
        let latest = require(&self.latest, Phase::Isolated, Analysis::Latest)?;
        tracing::debug!("step 4: isolation");
        let solution = isolated::analyze(self.graph, latest, self.options.seeding, observer);
        Ok(self.isolated.insert(solution))
    }

    /// Every vector, once all four phases have converged.
    pub fn results(&self) -> Result<AnalysisResults<'_>, AnalysisError> {
        Ok(AnalysisResults {
            down_safety: require(&self.down_safety, Phase::Placement, Analysis::DownSafety)?,
            earliest: require(&self.earliest, Phase::Placement, Analysis::Earliest)?,
            delay: require(&self.delay, Phase::Placement, Analysis::Delay)?,
            latest: require(&self.latest, Phase::Placement, Analysis::Latest)?,
            isolated: require(&self.isolated, Phase::Placement, Analysis::Isolated)?,
        })
    }

    /// Classifies the converged vectors into placement sets.
    pub fn placement(&self) -> Result<Placement, AnalysisError> {
        Ok(Placement::classify(self.graph, &self.results()?))
    }

    /// Runs every phase in order and classifies the result.
    pub fn run_all(&mut self, observer: &mut dyn UpdateObserver) -> Result<Placement, AnalysisError> {
        self.run_down_safety(observer);
        self.run_earliest(observer)?;
        self.run_delay(observer)?;
        self.run_isolated(observer)?;
        self.placement()
    }
}
