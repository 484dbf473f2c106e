//! The flow graph the analyses run over.
//!
//! Nodes are plain indices: `0` is the synthetic entry, `N + 1` the synthetic
//! exit and `1..=N` are the real program points.  Each node carries two static
//! facts about the candidate expression: whether it is *used* (an upward
//! exposed evaluation) and whether it is *killed* (an operand is redefined).
//!
//! A [`FlowGraph`] can only be obtained from a [`GraphBuilder`], and has no
//! mutating methods, so it stays frozen for every analysis that borrows it.

use std::collections::BTreeSet as Set;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A node of the flow graph.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(n: usize) -> Self {
        NodeId(n)
    }
}

/// Misconfiguration detected while building a graph.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum GraphError {
    #[display(fmt = "node {} is outside of the graph [0, {}]", node, last)]
    NodeOutOfRange { node: NodeId, last: NodeId },
    #[display(fmt = "{} real nodes do not fit in memory", count)]
    TooManyNodes { count: usize },
}

impl std::error::Error for GraphError {}

/// A frozen flow graph with its `Used`/`Killed` attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowGraph {
    real_count: usize,
    succ_edges: Vec<Set<NodeId>>,
    pred_edges: Vec<Set<NodeId>>,
    used: Vec<bool>,
    killed: Vec<bool>,
}

impl FlowGraph {
    pub fn entry(&self) -> NodeId {
        NodeId(0)
    }

    pub fn exit(&self) -> NodeId {
        NodeId(self.real_count + 1)
    }

    /// Number of real nodes, `N`.
    pub fn real_count(&self) -> usize {
        self.real_count
    }

    /// Number of nodes including entry and exit, `N + 2`.
    pub fn len(&self) -> usize {
        self.real_count + 2
    }

    pub fn is_empty(&self) -> bool {
        self.real_count == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.len()).map(NodeId)
    }

    /// The real nodes `1..=N`, in ascending order.
    pub fn real_nodes(&self) -> impl Iterator<Item = NodeId> {
        (1..=self.real_count).map(NodeId)
    }

    pub fn is_real(&self, node: NodeId) -> bool {
        node.0 >= 1 && node.0 <= self.real_count
    }

    // an iterator over the successors of node.
    pub fn succ(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.succ_edges[node.0].iter().copied()
    }

    // an iterator over the predecessors of node.
    pub fn pred(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.pred_edges[node.0].iter().copied()
    }

    /// Every edge `(u, v)`, ordered by `u` then `v`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.succ_edges
            .iter()
            .enumerate()
            .flat_map(|(u, succs)| succs.iter().map(move |v| (NodeId(u), *v)))
    }

    pub fn is_used(&self, node: NodeId) -> bool {
        self.used[node.0]
    }

    pub fn is_killed(&self, node: NodeId) -> bool {
        self.killed[node.0]
    }

    pub fn used_nodes(&self) -> Set<NodeId> {
        self.nodes().filter(|n| self.is_used(*n)).collect()
    }

    pub fn killed_nodes(&self) -> Set<NodeId> {
        self.nodes().filter(|n| self.is_killed(*n)).collect()
    }
}

// a per-node table, or `None` if it cannot be reserved.
fn table<T: Clone>(len: usize, value: T) -> Option<Vec<T>> {
    let mut table = Vec::new();
    table.try_reserve_exact(len).ok()?;
    table.resize(len, value);
    Some(table)
}

/// Collects nodes, edges and attributes, checking every id as it arrives.
#[derive(Clone, Debug)]
pub struct GraphBuilder {
    graph: FlowGraph,
}

impl GraphBuilder {
    /// Starts a graph with `real_count` real nodes.  The boundary edges
    /// `entry -> 1` and `N -> exit` are always present.
    ///
    /// Fails with [`GraphError::TooManyNodes`] when the node tables cannot be
    /// allocated.
    pub fn new(real_count: usize) -> Result<Self, GraphError> {
        let too_many = GraphError::TooManyNodes { count: real_count };
        let len = real_count.checked_add(2).ok_or_else(|| too_many.clone())?;
        let mut builder = GraphBuilder {
            graph: FlowGraph {
                real_count,
                succ_edges: table(len, Set::new()).ok_or_else(|| too_many.clone())?,
                pred_edges: table(len, Set::new()).ok_or_else(|| too_many.clone())?,
                used: table(len, false).ok_or_else(|| too_many.clone())?,
                killed: table(len, false).ok_or(too_many)?,
            },
        };
        builder.insert_edge(NodeId(0), NodeId(1));
        if real_count > 0 {
            builder.insert_edge(NodeId(real_count), NodeId(real_count + 1));
        }
        Ok(builder)
    }

    fn check(&self, node: usize) -> Result<NodeId, GraphError> {
        let node = NodeId(node);
        let last = self.graph.exit();
        if node > last {
            return Err(GraphError::NodeOutOfRange { node, last });
        }
        Ok(node)
    }

    fn insert_edge(&mut self, u: NodeId, v: NodeId) {
        self.graph.succ_edges[u.0].insert(v);
        self.graph.pred_edges[v.0].insert(u);
    }

    pub fn add_edge(&mut self, u: usize, v: usize) -> Result<&mut Self, GraphError> {
        let u = self.check(u)?;
        let v = self.check(v)?;
        self.insert_edge(u, v);
        Ok(self)
    }

    pub fn set_used(&mut self, node: usize) -> Result<&mut Self, GraphError> {
        let node = self.check(node)?;
        self.graph.used[node.0] = true;
        Ok(self)
    }

    pub fn set_killed(&mut self, node: usize) -> Result<&mut Self, GraphError> {
        let node = self.check(node)?;
        self.graph.killed[node.0] = true;
        Ok(self)
    }

    pub fn build(self) -> FlowGraph {
        self.graph
    }
}
