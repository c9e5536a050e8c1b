use crate::{utils::thread::for_each_row_mut, Mat, Parallelism, Side};
use equator::assert;

/// Writes the transpose of the triangular half `side` of `src` into `dst`.
///
/// With [`Side::Upper`], `dst` receives a lower triangular matrix with `dst[i][j] = src[j][i]` for
/// `i >= j`. With [`Side::Lower`], `dst` receives an upper triangular matrix with
/// `dst[i][j] = src[j][i]` for `i <= j`. The other half of `dst` is set to zero, and the other half
/// of `src` is not accessed.
///
/// Rows of `dst` are written independently of each other and split between threads according to
/// `parallelism`.
///
/// # Panics
///
/// Panics if `src` is not square, or if the shapes of `dst` and `src` differ.
#[track_caller]
pub fn triangular_transpose_to(dst: &mut Mat, src: &Mat, side: Side, parallelism: Parallelism) {
    assert!(all(src.is_square(), dst.shape() == src.shape()));

    let n = src.nrows();
    let src = src.as_slice();
    for_each_row_mut(
        dst.as_mut_slice(),
        n,
        1,
        |i, row| {
            for (j, x) in row.iter_mut().enumerate() {
                let in_triangle = match side {
                    Side::Upper => j <= i,
                    Side::Lower => j >= i,
                };
                *x = if in_triangle { src[j * n + i] } else { 0.0 };
            }
        },
        parallelism,
    );
}

/// Returns the lower triangular transpose of the upper triangular factor `upper`.
///
/// See [`triangular_transpose_to`].
#[track_caller]
pub fn lower_from_upper(upper: &Mat, parallelism: Parallelism) -> Mat {
    let mut lower = Mat::zeros(upper.nrows(), upper.ncols());
    triangular_transpose_to(&mut lower, upper, Side::Upper, parallelism);
    lower
}
