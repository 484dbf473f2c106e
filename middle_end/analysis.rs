//! Worklist fixpoint solver for boolean dataflow equations.
//!
//! Every analysis of the code motion pipeline is a system of equations over
//! the two-point lattice `0 < 1`, one equation per node, of the shape
//!
//! ```text
//! value(n) = apply(n, ⊓ { term(m, value(m)) | m ∈ sources(n) })
//! ```
//!
//! where `sources(n)` are the successors of `n` for a backward analysis and
//! its predecessors for a forward one, and `⊓` is either conjunction or
//! disjunction.  An analysis only describes its equation by implementing
//! [`BitEquation`]; [`solve`] owns the iteration.

use std::collections::BTreeSet as Set;
use std::collections::VecDeque;
use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::flow_graph::{FlowGraph, NodeId};

pub mod delay;
pub mod down_safety;
pub mod earliest;
pub mod isolated;


/// The five result vectors of the pipeline.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Analysis {
    DownSafety,
    Earliest,
    Delay,
    Latest,
    Isolated,
}

/// The value a node holds in a result vector.
///
/// `Unknown` is only ever produced by [`Seeding::ReachableOnly`] for nodes the
/// solver never reached from the boundary.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize)]
pub enum Fact {
    Unknown,
    False,
    True,
}

impl Fact {
    pub fn resolved(self) -> Option<bool> {
        match self {
            Fact::Unknown => None,
            Fact::False => Some(false),
            Fact::True => Some(true),
        }
    }

    // Unknown never holds.
    pub fn holds(self) -> bool {
        self == Fact::True
    }
}

impl From<bool> for Fact {
    fn from(b: bool) -> Self {
        if b {
            Fact::True
        } else {
            Fact::False
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Values flow from successors into a node; the boundary is the exit.
    Backward,
    /// Values flow from predecessors into a node; the boundary is the entry.
    Forward,
}

impl Direction {
    pub fn boundary(self, graph: &FlowGraph) -> NodeId {
        match self {
            Direction::Backward => graph.exit(),
            Direction::Forward => graph.entry(),
        }
    }

    // the nodes whose values the equation of `node` reads.
    fn sources<'g>(
        self,
        graph: &'g FlowGraph,
        node: NodeId,
    ) -> Box<dyn Iterator<Item = NodeId> + 'g> {
        match self {
            Direction::Backward => Box::new(graph.succ(node)),
            Direction::Forward => Box::new(graph.pred(node)),
        }
    }

    // the nodes whose equations read the value of `node`.
    fn readers<'g>(
        self,
        graph: &'g FlowGraph,
        node: NodeId,
    ) -> Box<dyn Iterator<Item = NodeId> + 'g> {
        match self {
            Direction::Backward => Box::new(graph.pred(node)),
            Direction::Forward => Box::new(graph.succ(node)),
        }
    }
}

/// Which extreme solution of the equation system is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fixpoint {
    /// Start every node at `1`; values only fall.
    Greatest,
    /// Start every node at `0`; values only rise.
    Least,
}

impl Fixpoint {
    pub fn start(self) -> bool {
        matches!(self, Fixpoint::Greatest)
    }
}

/// How the neighbor terms of an equation are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Meet {
    /// Conjunction; the empty meet is `1`.
    All,
    /// Disjunction; the empty meet is `0`.
    Any,
}

impl Meet {
    pub fn identity(self) -> bool {
        matches!(self, Meet::All)
    }

    pub fn combine(self, lhs: bool, rhs: bool) -> bool {
        match self {
            Meet::All => lhs && rhs,
            Meet::Any => lhs || rhs,
        }
    }
}

/// How the worklist is seeded.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seeding {
    /// Every non-boundary node starts at the fixpoint's extreme and is queued.
    #[default]
    #[display(fmt = "eager")]
    Eager,
    /// Non-boundary nodes start `Unknown`; only the boundary's readers are
    /// queued, and `Unknown` neighbors are left out of every meet.
    #[display(fmt = "reachable-only")]
    ReachableOnly,
}

impl FromStr for Seeding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eager" => Ok(Seeding::Eager),
            "reachable-only" => Ok(Seeding::ReachableOnly),
            _ => Err(format!(
                "unknown seeding: {s} (expected `eager` or `reachable-only`)"
            )),
        }
    }
}

/// One boolean dataflow equation, instantiated for a specific graph and the
/// frozen results it depends on.
pub trait BitEquation {
    const ANALYSIS: Analysis;
    const DIRECTION: Direction;
    const FIXPOINT: Fixpoint;
    const MEET: Meet;

    /// The value the boundary node is pinned to.
    fn boundary(&self) -> bool;

    /// The contribution of neighbor `source` holding `value`.
    fn term(&self, source: NodeId, value: bool) -> bool;

    /// The value of `node` given the meet of its neighbor terms.
    fn apply(&self, node: NodeId, met: bool) -> bool;
}

/// A value flip observed while solving.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[display(fmt = "[Update] {}[{}] := {}", analysis, node, new)]
pub struct Update {
    pub analysis: Analysis,
    pub node: NodeId,
    pub old: Fact,
    pub new: Fact,
}

/// Receives every value flip the solver performs.  Observers are diagnostic
/// only; they cannot influence the result.
pub trait UpdateObserver {
    fn on_update(&mut self, update: Update);
}

/// Drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoObserver;

impl UpdateObserver for NoObserver {
    fn on_update(&mut self, _update: Update) {}
}

impl<F: FnMut(Update)> UpdateObserver for F {
    fn on_update(&mut self, update: Update) {
        self(update)
    }
}

/// Records every update in order.
#[derive(Clone, Debug, Default)]
pub struct UpdateLog(pub Vec<Update>);

impl UpdateLog {
    pub fn for_analysis(&self, analysis: Analysis) -> impl Iterator<Item = &Update> {
        self.0.iter().filter(move |u| u.analysis == analysis)
    }
}

impl UpdateObserver for UpdateLog {
    fn on_update(&mut self, update: Update) {
        self.0.push(update);
    }
}

/// Forwards every update to `tracing` at trace level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl UpdateObserver for TracingObserver {
    fn on_update(&mut self, update: Update) {
        tracing::trace!(
            analysis = %update.analysis,
            node = update.node.index(),
            old = %update.old,
            new = %update.new,
            "{update}"
        );
    }
}

/// A converged result vector, one fact per node including entry and exit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Solution {
    analysis: Analysis,
    facts: Vec<Fact>,
}

impl Solution {
    pub fn new(analysis: Analysis, facts: Vec<Fact>) -> Self {
        Solution { analysis, facts }
    }

    pub fn analysis(&self) -> Analysis {
        self.analysis
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// The fact of `node`.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not belong to the graph this solution was
    /// computed over; use [`Solution::get`] for ids of unknown origin.
    pub fn fact(&self, node: NodeId) -> Fact {
        self.facts[node.index()]
    }

    /// The fact of `node`, or `None` if it lies outside the graph.
    pub fn get(&self, node: NodeId) -> Option<Fact> {
        self.facts.get(node.index()).copied()
    }

    /// Whether `node` is `True`.  Panics like [`Solution::fact`].
    pub fn holds(&self, node: NodeId) -> bool {
        self.fact(node).holds()
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// The facts of the real nodes `1..=N`.
    pub fn real_facts(&self) -> impl Iterator<Item = (NodeId, Fact)> + '_ {
        let last = self.facts.len().saturating_sub(1);
        (1..last).map(|i| (NodeId(i), self.facts[i]))
    }

    /// The real nodes whose fact is `True`.
    pub fn holding(&self) -> Set<NodeId> {
        self.real_facts()
            .filter(|(_, fact)| fact.holds())
            .map(|(node, _)| node)
            .collect()
    }

    /// The real nodes the solver never resolved.
    pub fn unknown(&self) -> Set<NodeId> {
        self.real_facts()
            .filter(|(_, fact)| *fact == Fact::Unknown)
            .map(|(node, _)| node)
            .collect()
    }
}

// FIFO worklist that holds each node at most once.
struct Worklist {
    queue: VecDeque<NodeId>,
    queued: Vec<bool>,
}

impl Worklist {
    fn new(len: usize) -> Self {
        Worklist {
            queue: VecDeque::with_capacity(len),
            queued: vec![false; len],
        }
    }

    fn push(&mut self, node: NodeId) {
        if !self.queued[node.index()] {
            self.queued[node.index()] = true;
            self.queue.push_back(node);
        }
    }

    fn pop(&mut self) -> Option<NodeId> {
        let node = self.queue.pop_front()?;
        self.queued[node.index()] = false;
        Some(node)
    }
}

// re-evaluates the equation of `node` against the current facts.
fn evaluate<E: BitEquation>(
    graph: &FlowGraph,
    equation: &E,
    facts: &[Fact],
    node: NodeId,
) -> bool {
    let met = E::DIRECTION
        .sources(graph, node)
        .filter_map(|source| {
            facts[source.index()]
                .resolved()
                .map(|value| equation.term(source, value))
        })
        .fold(E::MEET.identity(), |acc, term| E::MEET.combine(acc, term));
    equation.apply(node, met)
}

/// Runs the worklist algorithm for `equation` until no value changes.
///
/// The boundary node of the equation's direction is pinned to
/// [`BitEquation::boundary`] and never re-evaluated.  Every flip is reported
/// to `observer`.
pub fn solve<E: BitEquation>(
    graph: &FlowGraph,
    equation: &E,
    seeding: Seeding,
    observer: &mut dyn UpdateObserver,
) -> Solution {
    let boundary = E::DIRECTION.boundary(graph);

    tracing::debug!(
        analysis = %E::ANALYSIS,
        nodes = graph.len(),
        %seeding,
        "solving"
    );

    let initial = match seeding {
        Seeding::Eager => Fact::from(E::FIXPOINT.start()),
        Seeding::ReachableOnly => Fact::Unknown,
    };
    let mut facts = vec![initial; graph.len()];
    facts[boundary.index()] = Fact::from(equation.boundary());

    let mut worklist = Worklist::new(graph.len());
    match seeding {
        Seeding::Eager => graph
            .nodes()
            .filter(|n| *n != boundary)
            .for_each(|n| worklist.push(n)),
        Seeding::ReachableOnly => E::DIRECTION
            .readers(graph, boundary)
            .filter(|n| *n != boundary)
            .for_each(|n| worklist.push(n)),
    }

    let mut evaluations = 0usize;
    let mut updates = 0usize;

    while let Some(node) = worklist.pop() {
        evaluations += 1;
        let old = facts[node.index()];
        let new = Fact::from(evaluate(graph, equation, &facts, node));
        if new == old {
            continue;
        }

        updates += 1;
        facts[node.index()] = new;
        observer.on_update(Update {
            analysis: E::ANALYSIS,
            node,
            old,
            new,
        });

        for reader in E::DIRECTION.readers(graph, node) {
            if reader != boundary {
                worklist.push(reader);
            }
        }
    }

    tracing::debug!(analysis = %E::ANALYSIS, evaluations, updates, "converged");

    Solution::new(E::ANALYSIS, facts)
}
