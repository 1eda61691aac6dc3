//! Chain flow graph and its force-directed node placement

use std::collections::BTreeSet;

use petgraph::graph::{DiGraph, NodeIndex};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::normalize::FlowRow;

/// Seed for the initial node positions
pub const LAYOUT_SEED: u64 = 42;
/// Optimal distance between nodes
pub const LAYOUT_K: f64 = 0.5;
/// Number of cooling iterations
pub const LAYOUT_ITERATIONS: usize = 50;
/// Widest edge, drawn for the heaviest flow
pub const MAX_EDGE_WIDTH: f64 = 10.0;

const MIN_DISTANCE: f64 = 0.01;

/// Metric that weights flow edges
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlowMetric {
    /// Distinct users
    Swappers,
    /// Distinct transfers
    Swaps,
    /// Fiat volume
    Volume,
}

impl FlowMetric {
    /// Tab order used by the dashboard.
    pub const ALL: [Self; 3] = [Self::Swappers, Self::Swaps, Self::Volume];

    /// Weight of `row` under this metric; missing volume weighs nothing.
    pub fn weight(self, row: &FlowRow) -> f64 {
        match self {
            Self::Swappers => row.users as f64,
            Self::Swaps => row.transfers as f64,
            Self::Volume => row.volume.unwrap_or_default(),
        }
    }
}

/// Directed chain graph; nodes are added in name order. Rows that land on
/// the same chain pair, such as NULL and literal `unknown` chains, share
/// one edge carrying their summed weight.
pub fn flow_graph(rows: &[FlowRow], metric: FlowMetric) -> DiGraph<String, f64> {
    let names: BTreeSet<&str> =
        rows.iter().flat_map(|r| [r.source.as_str(), r.destination.as_str()]).collect();
    let mut graph = DiGraph::with_capacity(names.len(), rows.len());
    let indices: Vec<(&str, NodeIndex)> =
        names.into_iter().map(|n| (n, graph.add_node(n.to_owned()))).collect();
    let index_of = |name: &str| {
        indices
            .binary_search_by(|(n, _)| (*n).cmp(name))
            .map(|i| indices[i].1)
            .ok()
    };
    for row in rows {
        if let (Some(a), Some(b)) = (index_of(&row.source), index_of(&row.destination)) {
            let weight = metric.weight(row);
            match graph.find_edge(a, b) {
                Some(edge) => graph[edge] += weight,
                None => {
                    graph.add_edge(a, b, weight);
                }
            }
        }
    }
    graph
}

/// Edge width scaled against the heaviest edge, never thinner than 1.
pub fn edge_width(weight: f64, max_weight: f64) -> f64 {
    if max_weight <= 0.0 {
        return 1.0;
    }
    (weight / max_weight * MAX_EDGE_WIDTH).max(1.0)
}

/// Fruchterman-Reingold placement of every node, rescaled into `[-1, 1]`.
/// Positions are indexed by `NodeIndex::index()`. The same graph always
/// yields the same positions.
pub fn spring_layout(graph: &DiGraph<String, f64>) -> Vec<[f64; 2]> {
    let n = graph.node_count();
    match n {
        0 => return Vec::new(),
        1 => return vec![[0.0, 0.0]],
        _ => {}
    }

    let max_weight = graph.edge_weights().copied().fold(0.0_f64, f64::max);
    let mut attraction = vec![vec![0.0; n]; n];
    for edge in graph.edge_indices() {
        let Some((a, b)) = graph.edge_endpoints(edge) else { continue };
        let w = if max_weight > 0.0 { graph[edge] / max_weight } else { 1.0 };
        attraction[a.index()][b.index()] += w;
        attraction[b.index()][a.index()] += w;
    }

    let mut rng = StdRng::seed_from_u64(LAYOUT_SEED);
    let mut pos: Vec<[f64; 2]> =
        (0..n).map(|_| [rng.r#gen::<f64>(), rng.r#gen::<f64>()]).collect();

    let mut temperature = 0.1;
    let cooling = temperature / (LAYOUT_ITERATIONS as f64 + 1.0);
    for _ in 0..LAYOUT_ITERATIONS {
        let mut displacement = vec![[0.0_f64; 2]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = pos[i][0] - pos[j][0];
                let dy = pos[i][1] - pos[j][1];
                let distance = dx.hypot(dy).max(MIN_DISTANCE);
                let force = LAYOUT_K * LAYOUT_K / (distance * distance)
                    - attraction[i][j] * distance / LAYOUT_K;
                displacement[i][0] += dx * force;
                displacement[i][1] += dy * force;
            }
        }
        for (p, d) in pos.iter_mut().zip(&displacement) {
            let length = d[0].hypot(d[1]).max(MIN_DISTANCE);
            p[0] += d[0] * temperature / length;
            p[1] += d[1] * temperature / length;
        }
        temperature -= cooling;
    }

    rescale(&mut pos);
    pos
}

/// Center on the origin and scale so the largest coordinate is 1.
fn rescale(pos: &mut [[f64; 2]]) {
    let n = pos.len() as f64;
    let mean_x = pos.iter().map(|p| p[0]).sum::<f64>() / n;
    let mean_y = pos.iter().map(|p| p[1]).sum::<f64>() / n;
    let mut extent = 0.0_f64;
    for p in pos.iter_mut() {
        p[0] -= mean_x;
        p[1] -= mean_y;
        extent = extent.max(p[0].abs()).max(p[1].abs());
    }
    if extent > 0.0 {
        for p in pos.iter_mut() {
            p[0] /= extent;
            p[1] /= extent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::normalize::{ResultTable, normalize};
    use serde_json::{Value, json};
    use warehouse::MetricView;

    fn flow(source: &str, destination: &str, users: u64, volume: Option<f64>) -> FlowRow {
        FlowRow {
            source: source.to_owned(),
            destination: destination.to_owned(),
            volume,
            transfers: users * 2,
            users,
        }
    }

    fn sample() -> Vec<FlowRow> {
        vec![
            flow("ethereum", "arbitrum", 40, Some(1_000_000.0)),
            flow("arbitrum", "ethereum", 10, Some(20_000.0)),
            flow("base", "arbitrum", 5, None),
            flow("polygon", "polygon", 1, Some(10.0)),
        ]
    }

    #[test]
    fn edge_width_scales_against_max() {
        assert_eq!(edge_width(50.0, 50.0), 10.0);
        assert_eq!(edge_width(25.0, 50.0), 5.0);
        assert_eq!(edge_width(1.0, 50.0), 1.0);
        assert_eq!(edge_width(0.0, 0.0), 1.0);
    }

    #[test]
    fn graph_has_one_node_per_chain() {
        let graph = flow_graph(&sample(), FlowMetric::Swappers);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        let names: Vec<&str> = graph.node_weights().map(String::as_str).collect();
        assert_eq!(names, vec!["arbitrum", "base", "ethereum", "polygon"]);
    }

    #[test]
    fn volume_weights_treat_missing_as_zero() {
        let graph = flow_graph(&sample(), FlowMetric::Volume);
        let max = graph.edge_weights().copied().fold(0.0_f64, f64::max);
        assert_eq!(max, 1_000_000.0);
        assert!(graph.edge_weights().any(|w| *w == 0.0));
    }

    #[test]
    fn layout_is_deterministic_and_bounded() {
        let graph = flow_graph(&sample(), FlowMetric::Swaps);
        let first = spring_layout(&graph);
        let second = spring_layout(&graph);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        for p in &first {
            assert!(p[0].abs() <= 1.0 + 1e-9 && p[1].abs() <= 1.0 + 1e-9);
        }
        let on_edge = |c: f64| (c.abs() - 1.0).abs() < 1e-9;
        assert!(first.iter().any(|p| on_edge(p[0]) || on_edge(p[1])));
    }

    #[test]
    fn tiny_graphs() {
        assert!(spring_layout(&DiGraph::new()).is_empty());
        let graph = flow_graph(&[flow("a", "a", 1, None)], FlowMetric::Swappers);
        assert_eq!(spring_layout(&graph), vec![[0.0, 0.0]]);
    }

    #[test]
    fn null_and_unknown_chains_share_one_summed_edge() {
        let Value::Array(raw) = json!([
            {"source_chain": null, "destination_chain": "base", "swap_volume": 70.0, "swap_count": "7", "swapper_count": "3"},
            {"source_chain": "unknown", "destination_chain": "base", "swap_volume": 20.0, "swap_count": "2", "swapper_count": "1"}
        ]) else {
            unreachable!()
        };
        let raw: Vec<_> = raw.into_iter().filter_map(|v| v.as_object().cloned()).collect();
        let ResultTable::ChainFlow(rows) = normalize(MetricView::ChainFlow, &raw).unwrap() else {
            panic!("expected flow");
        };

        let graph = flow_graph(&rows, FlowMetric::Swaps);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_weights().copied().collect::<Vec<_>>(), vec![9.0]);

        let volume = flow_graph(&rows, FlowMetric::Volume);
        assert_eq!(volume.edge_weights().copied().collect::<Vec<_>>(), vec![90.0]);
    }
}
