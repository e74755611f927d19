//! Uncoupled greedy aggregation.
//!
//! Each rank aggregates only the vertices it owns. Ghost neighbors are never
//! joined and count as already claimed (by their owning rank) in the seeding
//! test, so boundary aggregates depend on the partition into ranks but never
//! on message timing.

use std::collections::BTreeMap;

use crate::aggregation::{Aggregates, NodeState, visit_order};
use crate::config::AggregationOptions;
use crate::error::MgError;
use crate::graph::SparseGraph;
use crate::parallel::Comm;

const UNAGGREGATED: usize = usize::MAX;

/// Three-phase aggregation: ordering, seed aggregation, leftover absorption.
#[derive(Debug, Clone, Default)]
pub struct UncoupledAggregation {
    options: AggregationOptions,
}

struct Assignment {
    state: Vec<NodeState>,
    aggregate: Vec<usize>,
    roots: Vec<usize>,
}

impl Assignment {
    fn new(n: usize) -> Self {
        Self { state: vec![NodeState::Ready; n], aggregate: vec![UNAGGREGATED; n], roots: Vec::new() }
    }

    fn is_aggregated(&self, v: usize) -> bool {
        self.aggregate[v] != UNAGGREGATED
    }

    fn open(&mut self, root: usize, members: &[usize]) -> usize {
        let id = self.roots.len();
        self.roots.push(root);
        for &w in members {
            self.join(w, id);
        }
        id
    }

    fn join(&mut self, v: usize, id: usize) {
        self.aggregate[v] = id;
        self.state[v] = NodeState::Aggregated;
    }
}

impl UncoupledAggregation {
    pub fn new(options: AggregationOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AggregationOptions {
        &self.options
    }

    /// Aggregate the local vertices of `graph`.
    ///
    /// Collective over `comm`: global aggregate ids are offset by the number of
    /// aggregates on lower ranks.
    pub fn build<C: Comm + ?Sized>(&self, graph: &SparseGraph, comm: &C) -> Result<Aggregates, MgError> {
        let order = visit_order(graph, &self.options);
        let mut assignment = Assignment::new(graph.num_local());

        let dissolved = self.seed_phase(graph, &order, &mut assignment);
        let absorbed = self.absorb_leftovers(graph, &order, &mut assignment)?;

        let mut singletons = 0;
        for &v in &order {
            if !assignment.is_aggregated(v) {
                assignment.open(v, &[v]);
                singletons += 1;
            }
        }

        let local = assignment.roots.len() as u64;
        let offset = comm.exclusive_scan(local) as usize;
        let global = comm.all_reduce_sum(local) as usize;
        log::debug!(
            "aggregation ({:?} ordering): {} local / {} global aggregates from {} vertices; {} dissolved, {} absorbed, {} singletons",
            self.options.ordering,
            local,
            global,
            graph.num_local(),
            dissolved,
            absorbed,
            singletons
        );
        if dissolved > 0 {
            log::warn!("aggregation dissolved {dissolved} aggregates below {} nodes", self.options.min_nodes_per_aggregate);
        }
        Ok(Aggregates::new(assignment.aggregate, assignment.roots, comm.rank(), offset, global))
    }

    /// Phase 2: every ready vertex with few enough claimed neighbors seeds an
    /// aggregate with its unaggregated neighbors. Returns the number of
    /// tentative aggregates dissolved for being too small.
    fn seed_phase(&self, graph: &SparseGraph, order: &[usize], assignment: &mut Assignment) -> usize {
        let mut dissolved = 0;
        for &v in order {
            if assignment.state[v] != NodeState::Ready {
                continue;
            }
            let neighbors = graph.neighbors(v);
            let claimed = neighbors
                .iter()
                .filter(|&&w| !graph.is_local(w) || assignment.is_aggregated(w))
                .count();
            if claimed > self.options.max_neigh_already_selected {
                assignment.state[v] = NodeState::NotSelected;
                continue;
            }
            let members: Vec<usize> = std::iter::once(v)
                .chain(neighbors.iter().copied().filter(|&w| graph.is_local(w) && !assignment.is_aggregated(w)))
                .collect();
            if members.len() < self.options.min_nodes_per_aggregate {
                assignment.state[v] = NodeState::NotSelected;
                dissolved += 1;
                continue;
            }
            assignment.open(v, &members);
        }
        dissolved
    }

    /// Phase 3: sweep until every vertex is aggregated or a sweep absorbs
    /// nothing. Returns the number of absorbed vertices.
    fn absorb_leftovers(
        &self,
        graph: &SparseGraph,
        order: &[usize],
        assignment: &mut Assignment,
    ) -> Result<usize, MgError> {
        let mut total = 0;
        let mut remaining = order.iter().filter(|&&v| !assignment.is_aggregated(v)).count();
        for _ in 0..self.options.max_iterations {
            if remaining == 0 {
                return Ok(total);
            }
            let mut absorbed = 0;
            for &v in order {
                if assignment.is_aggregated(v) {
                    continue;
                }
                if let Some(target) = self.vote(graph, v, assignment) {
                    assignment.join(v, target);
                    absorbed += 1;
                }
            }
            if absorbed == 0 {
                return Ok(total);
            }
            total += absorbed;
            remaining -= absorbed;
        }
        if remaining == 0 {
            return Ok(total);
        }
        log::warn!("aggregation: {remaining} vertices left after {} absorption sweeps", self.options.max_iterations);
        Err(MgError::AggregationFailed { iterations: self.options.max_iterations })
    }

    /// Aggregate `v` should join, if its aggregated fraction is above the threshold.
    fn vote(&self, graph: &SparseGraph, v: usize, assignment: &Assignment) -> Option<usize> {
        let mut local_neighbors = 0usize;
        let mut votes: BTreeMap<usize, usize> = BTreeMap::new();
        for &w in graph.neighbors(v).iter().filter(|&&w| graph.is_local(w)) {
            local_neighbors += 1;
            if assignment.is_aggregated(w) {
                *votes.entry(assignment.aggregate[w]).or_default() += 1;
            }
        }
        let aggregated: usize = votes.values().sum();
        if aggregated == 0 || (aggregated as f64) / (local_neighbors as f64) <= self.options.phase3_agg_creation {
            return None;
        }
        // BTreeMap iterates ids ascending; keep the first maximum.
        votes
            .into_iter()
            .fold(None, |best: Option<(usize, usize)>, (id, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((id, n)),
            })
            .map(|(id, _)| id)
    }
}
