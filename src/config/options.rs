//! Options for the multigrid setup.
//!
//! Plain parameter structs with defaults, consumed by the aggregation engine,
//! the builtin factories, the hierarchy driver and the element colorer.

/// Order in which aggregation visits vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    /// Index order.
    #[default]
    Natural,
    /// Uniform shuffle driven by [`AggregationOptions::random_seed`].
    Random,
    /// Breadth-first traversal, one traversal per connected component.
    Graph,
}

/// Where the breadth-first `Graph` ordering starts in each connected component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphSeedRule {
    /// The lowest-index vertex not visited yet.
    #[default]
    LowestUnvisited,
    /// The unvisited vertex of smallest degree, ties to the lowest index.
    MinimumDegree,
}

/// Uncoupled aggregation parameters.
#[derive(Debug, Clone)]
pub struct AggregationOptions {
    pub ordering: Ordering,
    /// Seed for `Ordering::Random`.
    pub random_seed: u64,
    /// Component seed for `Ordering::Graph`.
    pub graph_seed: GraphSeedRule,
    /// Tentative aggregates smaller than this are dissolved.
    pub min_nodes_per_aggregate: usize,
    /// A vertex may seed an aggregate only if at most this many neighbors are already claimed.
    pub max_neigh_already_selected: usize,
    /// Leftover vertices join a neighboring aggregate when their fraction of
    /// aggregated neighbors is above this value.
    pub phase3_agg_creation: f64,
    /// Upper bound on leftover-absorption sweeps.
    pub max_iterations: usize,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            ordering: Ordering::Natural,
            random_seed: 42,
            graph_seed: GraphSeedRule::LowestUnvisited,
            min_nodes_per_aggregate: 2,
            max_neigh_already_selected: 0,
            phase3_agg_creation: 0.5,
            max_iterations: 10_000,
        }
    }
}

/// Strength-of-connection dropping used when building the aggregation graph.
#[derive(Debug, Clone, Copy)]
pub struct DropOptions {
    /// Couplings with |a_ij| / sqrt(|a_ii| |a_jj|) <= drop_tol are removed; 0 keeps every entry.
    pub drop_tol: f64,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self { drop_tol: 0.0 }
    }
}

/// Hierarchy construction limits.
#[derive(Debug, Clone)]
pub struct HierarchyOptions {
    /// Maximum number of levels including the finest.
    pub max_levels: usize,
    /// Stop coarsening once an operator has at most this many global rows.
    pub max_coarse_size: usize,
    /// Compute `Pᵀ·A·P` without forming `R`.
    pub implicit_transpose: bool,
    /// Scale tentative prolongator columns to unit 2-norm.
    pub normalize_prolongator: bool,
}

impl Default for HierarchyOptions {
    fn default() -> Self {
        Self {
            max_levels: 10,
            max_coarse_size: 50,
            implicit_transpose: false,
            normalize_prolongator: true,
        }
    }
}

/// Element coloring parameters.
#[derive(Debug, Clone, Copy)]
pub struct ColorerOptions {
    /// Exclusive upper bound on colors.
    pub max_colors: usize,
    /// Only color buckets with this topology key.
    pub element_type: Option<u32>,
}

impl Default for ColorerOptions {
    fn default() -> Self {
        Self { max_colors: 100, element_type: None }
    }
}
