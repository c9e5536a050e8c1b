//! The Cholesky decomposition of a symmetric positive definite matrix $A$ is such that:
//! $$A = U^\top U,$$
//! where $U$ is an upper triangular matrix.
//!
//! The factor is computed row by row, then checked by transposing it into $L = U^\top$,
//! forming the triangular product $LU$, and comparing it with $A$ element by element.

/// Computing the decomposition.
pub mod compute;
/// Reconstructing the original matrix from the decomposition.
pub mod reconstruct;
/// Transposing triangular factors.
pub mod transpose;
/// Comparing a reconstruction with the original matrix.
pub mod verify;

/// This error signifies that the Cholesky decomposition could not be computed due to the matrix
/// not being numerically positive definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CholeskyError {
    /// The dimension of the first square non positive-definite top-left corner of the input
    /// matrix.
    pub non_positive_definite_minor: usize,
}

impl CholeskyError {
    /// Index of the row whose diagonal element could not be computed.
    #[inline]
    pub fn row(&self) -> usize {
        self.non_positive_definite_minor - 1
    }
}

impl core::fmt::Display for CholeskyError {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "matrix is not positive definite: the leading minor of order {} is not positive (row {})",
            self.non_positive_definite_minor,
            self.row(),
        )
    }
}

impl std::error::Error for CholeskyError {}
