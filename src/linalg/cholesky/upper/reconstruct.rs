use crate::{utils::thread::for_each_row_mut, Mat, Parallelism};
use equator::assert;

/// Minimum number of rows handed to a single task.
pub const RECONSTRUCT_MIN_LEN: usize = 8;

/// Computes the product of the lower triangular factor `lower` and the upper triangular factor
/// `upper`, and stores the result in `dst`.
///
/// Only the structurally nonzero terms are summed:
/// $$B_{ij} = \sum_{k \le \min(i, j)} L_{ik} U_{kj}.$$
///
/// Rows of `dst` are independent of each other and split between threads according to
/// `parallelism`.
///
/// # Panics
///
/// Panics if `lower` or `upper` are not square, or if the shapes of the three matrices differ.
#[track_caller]
pub fn reconstruct_to(dst: &mut Mat, lower: &Mat, upper: &Mat, parallelism: Parallelism) {
    assert!(all(
        lower.is_square(),
        upper.shape() == lower.shape(),
        dst.shape() == lower.shape(),
    ));

    let n = lower.nrows();
    let l = lower.as_slice();
    let u = upper.as_slice();
    for_each_row_mut(
        dst.as_mut_slice(),
        n,
        RECONSTRUCT_MIN_LEN,
        |i, row| {
            let l_row = &l[i * n..(i + 1) * n];
            for (j, x) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for k in 0..=Ord::min(i, j) {
                    acc += l_row[k] * u[k * n + j];
                }
                *x = acc;
            }
        },
        parallelism,
    );
}

/// Computes the product of the factors, returning it as a new matrix.
///
/// See [`reconstruct_to`].
#[track_caller]
pub fn reconstruct(lower: &Mat, upper: &Mat, parallelism: Parallelism) -> Mat {
    let mut dst = Mat::zeros(lower.nrows(), lower.ncols());
    reconstruct_to(&mut dst, lower, upper, parallelism);
    dst
}
