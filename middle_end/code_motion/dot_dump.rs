//! Implementation for generating a graphviz file for the flow graph.

use super::Placement;
use crate::middle_end::flow_graph::{FlowGraph, NodeId};

// the tags shown under a node id.
fn tags(graph: &FlowGraph, placement: Option<&Placement>, n: NodeId) -> Vec<&'static str> {
    let mut tags = vec![];
    if graph.is_used(n) {
        tags.push("use");
    }
    if graph.is_killed(n) {
        tags.push("kill");
    }
    if let Some(p) = placement {
        if p.bcm.contains(&n) {
            tags.push("bcm");
        }
        if p.optimal.contains(&n) {
            tags.push("insert");
        }
        if p.isolated.contains(&n) {
            tags.push("isolated");
        }
        if p.redundant.contains(&n) {
            tags.push("redundant");
        }
    }
    tags
}

/// Renders `graph` as a `digraph`, decorating nodes with their attributes and,
/// when given, their placement.
pub fn dump_dot(graph: &FlowGraph, placement: Option<&Placement>) -> String {
    let mut node_str = String::new();
    let mut edge_str = String::new();

    node_str.push_str(&format!(
        "\nn{} [label = \"entry\" shape=circle];\n",
        graph.entry()
    ));

    for n in graph.real_nodes() {
        let tags = tags(graph, placement, n);
        let label = if tags.is_empty() {
            n.to_string()
        } else {
            format!("{n}\\n{}", tags.join(" "))
        };
        let style = if placement.is_some_and(|p| p.lcm().contains(&n)) {
            " style=bold"
        } else {
            ""
        };
        node_str.push_str(&format!("\nn{n} [label = \"{label}\"{style}];\n"));
    }

    node_str.push_str(&format!(
        "\nn{} [label = \"exit\" shape=circle];\n",
        graph.exit()
    ));

    for (from, to) in graph.edges() {
        edge_str.push_str(&format!("\nn{from} -> n{to} [color=black];\n"));
    }

    format!(
        r#"digraph flow {{
node [shape=box];
{node_str}
{edge_str}
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middle_end::flow_graph::GraphBuilder;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet as Set;

    #[test]
    fn every_real_node_and_edge_is_emitted() {
        let mut builder = GraphBuilder::new(2).unwrap();
        builder.add_edge(1, 2).unwrap();
        builder.set_used(2).unwrap();
        builder.set_killed(1).unwrap();
        let graph = builder.build();

        let placement = Placement {
            isolated: Set::from([NodeId(2)]),
            ..Placement::default()
        };

        let expected = r#"digraph flow {
node [shape=box];

n0 [label = "entry" shape=circle];

n1 [label = "1\nkill"];

n2 [label = "2\nuse isolated" style=bold];

n3 [label = "exit" shape=circle];


n0 -> n1 [color=black];

n1 -> n2 [color=black];

n2 -> n3 [color=black];

}
"#;
        assert_eq!(dump_dot(&graph, Some(&placement)), expected);
    }

    #[test]
    fn placement_is_optional() {
        let graph = GraphBuilder::new(1).unwrap().build();
        let dot = dump_dot(&graph, None);
        assert!(dot.contains("n1 [label = \"1\"];"));
        assert!(dot.contains("n0 -> n1 [color=black];"));
        assert!(dot.contains("n1 -> n2 [color=black];"));
    }
}
