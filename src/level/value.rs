//! Tagged values stored on a level.

use std::sync::Arc;

use crate::aggregation::Aggregates;
use crate::graph::SparseGraph;
use crate::matrix::CsrMatrix;

/// Column-major block of vectors: `columns[k][i]` is entry `i` of vector `k`.
pub type MultiVector = Vec<Vec<f64>>;

/// A value stored on a [`Level`](crate::level::Level).
///
/// Large objects are shared: the producer, the level and every consumer hold
/// the same allocation, which lives as long as its longest holder.
#[derive(Debug, Clone)]
pub enum LevelValue {
    Matrix(Arc<CsrMatrix<f64>>),
    Graph(Arc<SparseGraph>),
    Aggregates(Arc<Aggregates>),
    MultiVector(Arc<MultiVector>),
    Int(i64),
    Real(f64),
    Text(String),
}

impl LevelValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            LevelValue::Matrix(_) => "Matrix",
            LevelValue::Graph(_) => "Graph",
            LevelValue::Aggregates(_) => "Aggregates",
            LevelValue::MultiVector(_) => "MultiVector",
            LevelValue::Int(_) => "Int",
            LevelValue::Real(_) => "Real",
            LevelValue::Text(_) => "Text",
        }
    }

    /// Short rendering for level tables: scalars in full, objects by size.
    pub fn summary(&self) -> String {
        match self {
            LevelValue::Matrix(m) => format!("{}x{}, nnz {}", m.nrows(), m.ncols(), m.nnz()),
            LevelValue::Graph(g) => format!("{} vertices, {} edges", g.num_vertices(), g.num_edges()),
            LevelValue::Aggregates(a) => format!("{} aggregates", a.num_aggregates()),
            LevelValue::MultiVector(v) => format!("{} vectors", v.len()),
            LevelValue::Int(i) => i.to_string(),
            LevelValue::Real(r) => r.to_string(),
            LevelValue::Text(s) => s.clone(),
        }
    }
}

/// Typed extraction from a [`LevelValue`].
pub trait FromLevelValue: Sized {
    const TYPE_NAME: &'static str;
    fn from_level_value(value: &LevelValue) -> Option<Self>;
}

macro_rules! level_value_conversions {
    ($variant:ident, $ty:ty, shared) => {
        impl FromLevelValue for Arc<$ty> {
            const TYPE_NAME: &'static str = stringify!($variant);
            fn from_level_value(value: &LevelValue) -> Option<Self> {
                match value {
                    LevelValue::$variant(v) => Some(Arc::clone(v)),
                    _ => None,
                }
            }
        }
        impl From<Arc<$ty>> for LevelValue {
            fn from(v: Arc<$ty>) -> Self {
                LevelValue::$variant(v)
            }
        }
        impl From<$ty> for LevelValue {
            fn from(v: $ty) -> Self {
                LevelValue::$variant(Arc::new(v))
            }
        }
    };
    ($variant:ident, $ty:ty, plain) => {
        impl FromLevelValue for $ty {
            const TYPE_NAME: &'static str = stringify!($variant);
            fn from_level_value(value: &LevelValue) -> Option<Self> {
                match value {
                    LevelValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
        impl From<$ty> for LevelValue {
            fn from(v: $ty) -> Self {
                LevelValue::$variant(v)
            }
        }
    };
}

level_value_conversions!(Matrix, CsrMatrix<f64>, shared);
level_value_conversions!(Graph, SparseGraph, shared);
level_value_conversions!(Aggregates, Aggregates, shared);
level_value_conversions!(MultiVector, MultiVector, shared);
level_value_conversions!(Int, i64, plain);
level_value_conversions!(Real, f64, plain);
level_value_conversions!(Text, String, plain);

impl From<&str> for LevelValue {
    fn from(v: &str) -> Self {
        LevelValue::Text(v.to_string())
    }
}
