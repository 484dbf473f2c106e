use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::front_end::parse_graph;
use crate::middle_end::analysis::{NoObserver, UpdateLog};
use crate::middle_end::flow_graph::{GraphBuilder, NodeId};
use std::collections::BTreeSet as Set;

fn graph(real_count: usize, edges: &[(usize, usize)], used: &[usize], killed: &[usize]) -> FlowGraph {
    let mut builder = GraphBuilder::new(real_count).unwrap();
    for (u, v) in edges {
        builder.add_edge(*u, *v).unwrap();
    }
    for n in used {
        builder.set_used(*n).unwrap();
    }
    for n in killed {
        builder.set_killed(*n).unwrap();
    }
    builder.build()
}

fn ids(nodes: &[usize]) -> Set<NodeId> {
    nodes.iter().map(|n| NodeId(*n)).collect()
}

fn demonstration_graph() -> FlowGraph {
    let input = std::fs::read_to_string("test-data/busy_code_motion.graph")
        .expect("The demonstration graph is missing");
    parse_graph(&input).unwrap()
}

// SECTION: phase ordering

#[test]
fn phases_refuse_to_run_early() {
    let g = graph(2, &[(1, 2)], &[2], &[]);
    let mut session = CodeMotion::new(&g);

    assert_eq!(
        session.run_earliest(&mut NoObserver).unwrap_err(),
        AnalysisError::OutOfOrder {
            phase: Phase::Earliest,
            requires: Analysis::DownSafety,
        }
    );
    assert_eq!(
        session.run_delay(&mut NoObserver).unwrap_err(),
        AnalysisError::OutOfOrder {
            phase: Phase::Delay,
            requires: Analysis::DownSafety,
        }
    );

    session.run_down_safety(&mut NoObserver);
    assert_eq!(
        session.run_delay(&mut NoObserver).unwrap_err(),
        AnalysisError::OutOfOrder {
            phase: Phase::Delay,
            requires: Analysis::Earliest,
        }
    );
    assert_eq!(
        session.run_isolated(&mut NoObserver).unwrap_err(),
        AnalysisError::OutOfOrder {
            phase: Phase::Isolated,
            requires: Analysis::Latest,
        }
    );

    session.run_earliest(&mut NoObserver).unwrap();
    session.run_delay(&mut NoObserver).unwrap();
    let err = session.placement().unwrap_err();
    assert_eq!(
        err,
        AnalysisError::OutOfOrder {
            phase: Phase::Placement,
            requires: Analysis::Isolated,
        }
    );
    assert_eq!(
        err.to_string(),
        "Placement cannot run before Isolated has converged"
    );

    session.run_isolated(&mut NoObserver).unwrap();
    assert!(session.placement().is_ok());
}

#[test]
fn report_needs_a_finished_session() {
    let g = graph(1, &[], &[1], &[]);
    let session = CodeMotion::new(&g);
    assert_eq!(
        Report::new(&session).unwrap_err(),
        AnalysisError::OutOfOrder {
            phase: Phase::Placement,
            requires: Analysis::DownSafety,
        }
    );
}

#[test]
fn solutions_appear_as_phases_run() {
    let g = graph(2, &[(1, 2)], &[2], &[]);
    let mut session = CodeMotion::new(&g);
    assert!(session.solution(Analysis::DownSafety).is_none());

    session.run_down_safety(&mut NoObserver);
    session.run_earliest(&mut NoObserver).unwrap();
    let latest = session.run_delay(&mut NoObserver).unwrap().clone();

    assert_eq!(session.solution(Analysis::Latest), Some(&latest));
    assert_eq!(
        session.solution(Analysis::Delay).map(Solution::analysis),
        Some(Analysis::Delay)
    );
    assert!(session.solution(Analysis::Isolated).is_none());
}

#[test]
fn rerunning_a_phase_leaves_every_vector_unchanged() {
    let g = demonstration_graph();
    let mut session = CodeMotion::new(&g);
    let placement = session.run_all(&mut NoObserver).unwrap();
    let before = Report::new(&session).unwrap();

    session.run_down_safety(&mut NoObserver);
    session.run_earliest(&mut NoObserver).unwrap();
    session.run_delay(&mut NoObserver).unwrap();
    session.run_isolated(&mut NoObserver).unwrap();

    assert_eq!(Report::new(&session).unwrap(), before);
    assert_eq!(session.placement().unwrap(), placement);
}

// SECTION: placement

#[test]
fn linear_chain_has_nothing_to_hoist() {
    let g = graph(1, &[(0, 1), (1, 2)], &[1], &[]);
    let placement = CodeMotion::new(&g).run_all(&mut NoObserver).unwrap();

    assert_eq!(placement.bcm, ids(&[]));
    assert_eq!(placement.lcm(), ids(&[]));
    assert_eq!(placement.redundant, ids(&[1]));
}

#[test]
fn diamond_has_nothing_to_hoist() {
    let g = graph(3, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)], &[3], &[]);
    let mut session = CodeMotion::new(&g);
    let placement = session.run_all(&mut NoObserver).unwrap();

    assert_eq!(placement.bcm, ids(&[]));
    let results = session.results().unwrap();
    for n in g.real_nodes() {
        assert!(results.down_safety.holds(n), "DownSafety[{n}]");
        assert!(!results.earliest.holds(n), "Earliest[{n}]");
    }
}

#[test]
fn single_use_after_a_kill_stays_isolated() {
    // 0 -> 1 -> 2 -> 3 -> 4, kill at 2, use at 3
    let g = graph(3, &[(1, 2), (2, 3)], &[3], &[2]);
    let placement = CodeMotion::new(&g).run_all(&mut NoObserver).unwrap();

    assert_eq!(
        placement,
        Placement {
            bcm: ids(&[3]),
            optimal: ids(&[]),
            isolated: ids(&[3]),
            redundant: ids(&[]),
        }
    );
}

#[test]
fn second_use_reads_the_temporary() {
    // 0 -> 1 -> 2 -> 3 -> 4, kill at 1, uses at 2 and 3
    let g = graph(3, &[(1, 2), (2, 3)], &[2, 3], &[1]);
    let placement = CodeMotion::new(&g).run_all(&mut NoObserver).unwrap();

    assert_eq!(
        placement,
        Placement {
            bcm: ids(&[2]),
            optimal: ids(&[2]),
            isolated: ids(&[]),
            redundant: ids(&[2, 3]),
        }
    );
}

#[test]
fn demonstration_graph_placement() {
    let g = demonstration_graph();
    let placement = CodeMotion::new(&g).run_all(&mut NoObserver).unwrap();

    assert_eq!(placement.bcm, ids(&[3, 6]));
    assert_eq!(placement.optimal, ids(&[8, 15]));
    assert_eq!(placement.isolated, ids(&[3, 17]));
    assert_eq!(placement.redundant, ids(&[10, 15, 16]));
    assert_eq!(placement.lcm(), ids(&[3, 8, 15, 17]));
}

#[test]
fn sessions_share_a_graph_across_threads() {
    let g = demonstration_graph();
    let (eager, reachable) = std::thread::scope(|s| {
        let eager = s.spawn(|| CodeMotion::new(&g).run_all(&mut NoObserver));
        let reachable = s.spawn(|| {
            let options = SolverOptions {
                seeding: Seeding::ReachableOnly,
            };
            CodeMotion::with_options(&g, options).run_all(&mut NoObserver)
        });
        (eager.join().unwrap(), reachable.join().unwrap())
    });

    // every node lies between entry and exit, so both seedings converge to
    // the same vectors.
    assert_eq!(eager.unwrap(), reachable.unwrap());
}

#[test]
fn observers_see_every_phase() {
    let g = demonstration_graph();
    let mut log = UpdateLog::default();
    CodeMotion::new(&g).run_all(&mut log).unwrap();

    for analysis in [
        Analysis::DownSafety,
        Analysis::Earliest,
        Analysis::Delay,
        Analysis::Isolated,
    ] {
        assert!(log.for_analysis(analysis).count() > 0, "{analysis}");
        assert!(log.for_analysis(analysis).count() <= 2 * g.len());
    }
    // `Latest` is derived, not solved.
    assert_eq!(log.for_analysis(Analysis::Latest).count(), 0);
}

// SECTION: options

#[test]
fn options_read_from_json() {
    assert_eq!(SolverOptions::from_json("{}").unwrap(), SolverOptions::default());
    assert_eq!(
        SolverOptions::from_json(r#"{ "seeding": "reachable-only" }"#).unwrap(),
        SolverOptions {
            seeding: Seeding::ReachableOnly,
        }
    );
    assert!(SolverOptions::from_json(r#"{ "seeding": "lazy" }"#).is_err());
    assert!(SolverOptions::from_json(r#"{ "seed": "eager" }"#).is_err());
}

// SECTION: reports

#[test]
fn demonstration_report_matches_expected_output() {
    let g = demonstration_graph();
    let mut session = CodeMotion::new(&g);
    session.run_all(&mut NoObserver).unwrap();

    let expected = std::fs::read_to_string("test-data/busy_code_motion.report")
        .expect("The expected report is missing");
    assert_eq!(Report::new(&session).unwrap().to_string(), expected);
}

#[test]
fn unknown_nodes_are_listed_separately() {
    // 2 loops on itself and never reaches the exit.
    let g = graph(3, &[(1, 2), (2, 2), (1, 3)], &[3], &[]);
    let options = SolverOptions {
        seeding: Seeding::ReachableOnly,
    };
    let mut session = CodeMotion::with_options(&g, options);
    session.run_all(&mut NoObserver).unwrap();
    let report = Report::new(&session).unwrap();

    assert_eq!(report.vectors[0].unknown, ids(&[2]));
    assert_eq!(report.vectors[1].unknown, ids(&[]));

    let text = report.to_string();
    assert!(text.starts_with("3 real nodes, used {3}, killed {}, seeding reachable-only\n"));
    assert!(text.contains("[DownSafety Result]: 1, 3\n[DownSafety Unknown]: 2\n"));
    assert!(text.contains("[Isolated Unknown]: 2\n"));
    assert!(!text.contains("[Earliest Unknown]"));
}

#[test]
fn report_serializes_to_json() {
    let g = demonstration_graph();
    let mut session = CodeMotion::new(&g);
    session.run_all(&mut NoObserver).unwrap();

    let text = Report::new(&session).unwrap().to_json().unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(json["seeding"], json!("eager"));
    assert_eq!(json["real_nodes"], json!(18));
    assert_eq!(json["used"], json!([3, 10, 15, 16, 17]));
    assert_eq!(json["killed"], json!([2]));
    assert_eq!(
        json["vectors"][3],
        json!({ "analysis": "Latest", "holding": [3, 8, 15, 17] })
    );
    assert_eq!(
        json["placement"],
        json!({
            "bcm": [3, 6],
            "optimal": [8, 15],
            "isolated": [3, 17],
            "redundant": [10, 15, 16],
        })
    );
}

// SECTION: classifier properties

prop_compose! {
    fn arb_graph()(real_count in 1usize..9)
        (
            edges in prop::collection::vec((0..real_count + 2, 0..real_count + 2), 0..24),
            used in prop::collection::vec(1..real_count + 1, 0..4),
            killed in prop::collection::vec(1..real_count + 1, 0..3),
            real_count in Just(real_count),
        ) -> FlowGraph {
        graph(real_count, &edges, &used, &killed)
    }
}

fn arb_seeding() -> impl Strategy<Value = Seeding> {
    prop_oneof![Just(Seeding::Eager), Just(Seeding::ReachableOnly)]
}

proptest! {
    #[test]
    fn placement_partitions_real_nodes(g in arb_graph(), seeding in arb_seeding()) {
        let mut session = CodeMotion::with_options(&g, SolverOptions { seeding });
        let placement = session.run_all(&mut NoObserver).unwrap();
        let latest = session.solution(Analysis::Latest).unwrap();

        for n in g.real_nodes() {
            let classes = [
                placement.optimal.contains(&n),
                placement.isolated.contains(&n),
                !latest.holds(n),
            ];
            prop_assert_eq!(classes.iter().filter(|c| **c).count(), 1, "node {}", n);

            if g.is_used(n) {
                prop_assert!(placement.redundant.contains(&n) != placement.isolated.contains(&n));
            } else {
                prop_assert!(!placement.redundant.contains(&n));
            }
        }
        prop_assert!(placement.lcm().iter().all(|n| g.is_real(*n)));
        prop_assert!(placement.bcm.iter().all(|n| g.is_real(*n)));
    }
}
