use super::CholeskyError;
use crate::{
    utils::thread::{for_each_mut, sum},
    Mat, Parallelism,
};
use equator::assert;

/// Minimum number of columns handed to a single task during the off-diagonal sweep.
pub const SWEEP_MIN_LEN: usize = 16;

/// Computes the Cholesky factor $U$ of a symmetric positive definite input matrix $A$ such that
/// $U$ is upper triangular, and
/// $$U^\top U == A,$$
/// then stores it in `dst`, or returns an error if the matrix is not positive definite.
///
/// The factor is computed one row at a time. For row `i`, the diagonal element is
/// $$U_{ii} = \sqrt{A_{ii} - \sum_{k < i} U_{ki}^2},$$
/// and the remaining elements of the row are
/// $$U_{ij} = \left(A_{ij} - \sum_{k < i} U_{ki} U_{kj}\right) / U_{ii}, \quad j > i.$$
///
/// Rows depend on every previous row, so they are computed in order. Within a row, the diagonal
/// sum of squares is a reduction, and the off-diagonal elements are independent of each other.
/// Both are split between threads according to `parallelism`. With [`Parallelism::None`], the
/// result is deterministic.
///
/// Only the upper triangular part of `src` is read. The strictly lower triangular part of `dst`
/// is set to zero.
///
/// # Errors
///
/// Returns [`CholeskyError`] as soon as a diagonal radicand is not strictly positive. `dst` then
/// holds the rows computed so far.
///
/// # Panics
///
/// Panics if `src` is not square, or if the shapes of `dst` and `src` differ.
#[track_caller]
pub fn cholesky_upper_to(
    dst: &mut Mat,
    src: &Mat,
    parallelism: Parallelism,
) -> Result<(), CholeskyError> {
    assert!(all(src.is_square(), dst.shape() == src.shape()));

    let n = src.nrows();
    for i in 0..n {
        let (done, row) = dst.split_at_row_mut(i);
        let (lower, rest) = row.split_at_mut(i);
        lower.fill(0.0);

        // A_ii - U_{0..i, i}^T × U_{0..i, i}
        let dot = sum(
            i,
            |k| {
                let u = done[k * n + i];
                u * u
            },
            parallelism,
        );
        let radicand = src.read(i, i) - dot;

        if radicand.is_nan() || radicand <= 0.0 {
            log::debug!("non positive radicand {radicand:e} at row {i}");
            return Err(CholeskyError {
                non_positive_definite_minor: i + 1,
            });
        }

        let (diag, tail) = rest.split_at_mut(1);
        let u_ii = radicand.sqrt();
        diag[0] = u_ii;

        // U_{i, j} = (A_{i, j} - U_{0..i, i}^T × U_{0..i, j}) / U_ii
        let a_row = &src.row(i)[i + 1..];
        for_each_mut(
            tail,
            SWEEP_MIN_LEN,
            |jj, dst| {
                let j = i + 1 + jj;
                let mut dot = 0.0;
                for k in 0..i {
                    dot += done[k * n + i] * done[k * n + j];
                }
                *dst = (a_row[jj] - dot) / u_ii;
            },
            parallelism,
        );
    }

    Ok(())
}

/// Computes the Cholesky factor of `src`, returning it as a new matrix.
///
/// See [`cholesky_upper_to`].
#[track_caller]
pub fn cholesky_upper(src: &Mat, parallelism: Parallelism) -> Result<Mat, CholeskyError> {
    let mut dst = Mat::zeros(src.nrows(), src.ncols());
    cholesky_upper_to(&mut dst, src, parallelism)?;
    Ok(dst)
}
