//! Scheduling properties over generated field graphs

use proptest::prelude::*;
use reportfill_formula::DependencyGraph;

/// Random DAG: node `i` may only depend on nodes with a smaller index, then the
/// definition order is shuffled so the scheduler has real work to do.
fn dag() -> impl Strategy<Value = (Vec<usize>, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| {
        let edges = proptest::collection::vec((0..n, 0..n), 0..n * 3).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| if a < b { (a, b) } else { (b, a) })
                .collect::<Vec<_>>()
        });
        let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        (order, edges)
    })
}

fn name(i: usize) -> String {
    format!("f{}", i)
}

proptest! {
    #[test]
    fn acyclic_graphs_schedule_precedents_first((order, edges) in dag()) {
        let mut graph = DependencyGraph::new();
        for &i in &order {
            graph.add_node(&name(i));
        }
        for &(precedent, dependent) in &edges {
            graph.add_dependency(&name(precedent), &name(dependent));
        }

        let schedule = graph.schedule();

        prop_assert!(schedule.cycles.is_empty());
        prop_assert_eq!(schedule.order.len(), order.len());
        for &(precedent, dependent) in &edges {
            let p = schedule.position(&name(precedent));
            let d = schedule.position(&name(dependent));
            prop_assert!(p < d, "{} must come before {}", name(precedent), name(dependent));
        }
    }

    #[test]
    fn any_graph_emits_each_node_once(
        n in 1usize..16,
        edges in proptest::collection::vec((0usize..16, 0usize..16), 0..48),
    ) {
        let mut graph = DependencyGraph::new();
        for i in 0..n {
            graph.add_node(&name(i));
        }
        for (a, b) in edges.into_iter().filter(|(a, b)| *a < n && *b < n) {
            graph.add_dependency(&name(a), &name(b));
        }

        let schedule = graph.schedule();

        let mut seen = schedule.order.clone();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), n);
        prop_assert_eq!(schedule.order.len(), n);
    }
}
