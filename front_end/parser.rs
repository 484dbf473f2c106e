// Parser for flow graph descriptions.
//
//   # comment
//   nodes 18
//   edge 1 -> 2
//   used 3 10 15
//   killed 2
//
// `nodes` comes first; every id is checked by the graph builder.

use derive_more::Display;
use pest::error::Error;
use pest::iterators::Pair;
use pest::Parser;

use crate::middle_end::flow_graph::{FlowGraph, GraphBuilder, GraphError};

#[derive(pest_derive::Parser)]
#[grammar_inline = r##"
WHITESPACE = _{ " " | "\t" }
COMMENT = _{ "#" ~ (!NEWLINE ~ ANY)* }

graph = { SOI ~ NEWLINE* ~ nodes ~ (NEWLINE+ ~ stmt)* ~ NEWLINE* ~ EOI }

stmt = _{ edge | used | killed }

nodes = { "nodes" ~ number }
edge = { "edge" ~ number ~ "->" ~ number }
used = { "used" ~ number+ }
killed = { "killed" ~ number+ }

number = @{ ASCII_DIGIT+ }
"##]
struct GraphParser;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum GraphParseError {
    Syntax(Error<Rule>),
    #[display(fmt = "not a node id: {}", _0)]
    Number(String),
    Graph(GraphError),
}

impl std::error::Error for GraphParseError {}

impl From<GraphError> for GraphParseError {
    fn from(err: GraphError) -> Self {
        GraphParseError::Graph(err)
    }
}

pub fn parse_graph(input: &str) -> Result<FlowGraph, GraphParseError> {
    let mut parse_tree =
        GraphParser::parse(Rule::graph, input).map_err(GraphParseError::Syntax)?;
    match parse_tree.next() {
        Some(graph) => create_graph(graph),
        None => unreachable!("the graph rule always produces a pair"),
    }
}

impl std::str::FromStr for FlowGraph {
    type Err = GraphParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_graph(s)
    }
}

fn create_graph(parse_tree: Pair<Rule>) -> Result<FlowGraph, GraphParseError> {
    let mut statements = parse_tree.into_inner();

    let real_count = match statements.next() {
        Some(nodes) if nodes.as_rule() == Rule::nodes => {
            let mut inner = nodes.into_inner();
            match inner.next() {
                Some(n) => parse_number(n)?,
                None => unreachable!("nodes without a count"),
            }
        }
        _ => unreachable!("a graph starts with its node count"),
    };

    let mut builder = GraphBuilder::new(real_count)?;

    for stmt in statements {
        match stmt.as_rule() {
            Rule::edge => {
                let mut ends = stmt.into_inner();
                match (ends.next(), ends.next()) {
                    (Some(u), Some(v)) => {
                        builder.add_edge(parse_number(u)?, parse_number(v)?)?;
                    }
                    _ => unreachable!("edge doesn't have two ends"),
                }
            }
            Rule::used => {
                for n in stmt.into_inner() {
                    builder.set_used(parse_number(n)?)?;
                }
            }
            Rule::killed => {
                for n in stmt.into_inner() {
                    builder.set_killed(parse_number(n)?)?;
                }
            }
            Rule::EOI => (),
            _ => unreachable!("not a statement: {:#?}", stmt),
        }
    }

    Ok(builder.build())
}

fn parse_number(number: Pair<Rule>) -> Result<usize, GraphParseError> {
    number
        .as_str()
        .parse::<usize>()
        .map_err(|_| GraphParseError::Number(number.as_str().to_owned()))
}
