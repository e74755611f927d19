//! Aggregation: partition the vertices of a graph into disjoint aggregates,
//! each of which becomes one coarse unknown.

pub mod ordering;
pub mod uncoupled;

pub use ordering::visit_order;
pub use uncoupled::UncoupledAggregation;

/// Aggregation state of a local vertex while the phases run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Unaggregated and still allowed to seed an aggregate.
    Ready,
    /// Unaggregated; its seeding attempt failed.
    NotSelected,
    /// Member of an aggregate.
    Aggregated,
}

/// Result of aggregating the local vertices of one rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    vertex_to_aggregate: Vec<usize>,
    proc_winner: Vec<usize>,
    aggregate_sizes: Vec<usize>,
    roots: Vec<usize>,
    global_offset: usize,
    num_global: usize,
}

impl Aggregates {
    /// Assemble from a complete local assignment.
    ///
    /// `vertex_to_aggregate[v]` must be a valid index into `roots` for every vertex.
    pub(crate) fn new(
        vertex_to_aggregate: Vec<usize>,
        roots: Vec<usize>,
        rank: usize,
        global_offset: usize,
        num_global: usize,
    ) -> Self {
        let mut aggregate_sizes = vec![0; roots.len()];
        for &a in &vertex_to_aggregate {
            aggregate_sizes[a] += 1;
        }
        let proc_winner = vec![rank; vertex_to_aggregate.len()];
        Self { vertex_to_aggregate, proc_winner, aggregate_sizes, roots, global_offset, num_global }
    }

    /// Number of aggregates owned by this rank.
    pub fn num_aggregates(&self) -> usize {
        self.roots.len()
    }

    /// Number of aggregates over all ranks.
    pub fn num_global_aggregates(&self) -> usize {
        self.num_global
    }

    /// Global id of this rank's aggregate 0.
    pub fn global_offset(&self) -> usize {
        self.global_offset
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex_to_aggregate.len()
    }

    /// Local aggregate id of vertex `v`.
    pub fn aggregate_of(&self, v: usize) -> usize {
        self.vertex_to_aggregate[v]
    }

    /// Global aggregate id of vertex `v`.
    pub fn global_aggregate_of(&self, v: usize) -> usize {
        self.global_offset + self.vertex_to_aggregate[v]
    }

    pub fn vertex_to_aggregate(&self) -> &[usize] {
        &self.vertex_to_aggregate
    }

    /// Owning rank of each vertex's aggregate.
    pub fn proc_winner(&self) -> &[usize] {
        &self.proc_winner
    }

    pub fn aggregate_sizes(&self) -> &[usize] {
        &self.aggregate_sizes
    }

    /// Seed vertex of aggregate `agg`.
    pub fn root(&self, agg: usize) -> usize {
        self.roots[agg]
    }

    /// Member lists, sorted, indexed by local aggregate id.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.num_aggregates()];
        for (v, &a) in self.vertex_to_aggregate.iter().enumerate() {
            members[a].push(v);
        }
        members
    }
}
