//! Vertex visiting orders for the aggregation phases.
//!
//! The ordering is the only tie-breaking freedom of the aggregation: for a
//! fixed graph, option set and seed the returned sequence is always the same.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::config::{AggregationOptions, GraphSeedRule, Ordering};
use crate::graph::SparseGraph;

/// Permutation of the local vertices in the order aggregation visits them.
pub fn visit_order(graph: &SparseGraph, options: &AggregationOptions) -> Vec<usize> {
    let n = graph.num_local();
    match options.ordering {
        Ordering::Natural => (0..n).collect(),
        Ordering::Random => {
            let mut order: Vec<usize> = (0..n).collect();
            let mut rng = SmallRng::seed_from_u64(options.random_seed);
            order.shuffle(&mut rng);
            order
        }
        Ordering::Graph => breadth_first(graph, options.graph_seed),
    }
}

/// Breadth-first order covering every component; neighbors are queued in ascending index.
fn breadth_first(graph: &SparseGraph, seed_rule: GraphSeedRule) -> Vec<usize> {
    let n = graph.num_local();
    let candidates: Vec<usize> = match seed_rule {
        GraphSeedRule::LowestUnvisited => (0..n).collect(),
        GraphSeedRule::MinimumDegree => {
            let mut c: Vec<usize> = (0..n).collect();
            c.sort_by_key(|&v| (graph.degree(v), v));
            c
        }
    };
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    for &seed in &candidates {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &w in graph.neighbors(v) {
                if graph.is_local(w) && !visited[w] {
                    visited[w] = true;
                    queue.push_back(w);
                }
            }
        }
    }
    order
}
