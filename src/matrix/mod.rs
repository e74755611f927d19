//! Matrix module: CSR storage and sparse-sparse products.

pub mod sparse;
pub use sparse::CsrMatrix;
pub mod product;
pub use product::multiply;

/// Scalar types the sparse kernels operate on.
///
/// Addition is assumed commutative; the products only regroup partial sums,
/// they never change which terms are summed.
pub trait Scalar:
    Copy + Send + Sync + PartialEq + std::fmt::Debug + num_traits::Zero + num_traits::One + 'static
{
}

impl<T> Scalar for T where
    T: Copy + Send + Sync + PartialEq + std::fmt::Debug + num_traits::Zero + num_traits::One + 'static
{
}
