//! Random matrix distributions.

use crate::Mat;
use equator::assert;
use rand::{distributions::Distribution, Rng};
use rand_distr::Uniform;

/// The standard distribution. Samples values uniformly distributed in `[-1, 1]` for
/// `0 <= i < nrows`, `0 <= j < ncols`.
pub struct StandardMat {
    /// Number of rows of the sampled matrix.
    pub nrows: usize,
    /// Number of columns of the sampled matrix.
    pub ncols: usize,
}

/// Samples random symmetric positive definite matrices of dimension `dimension`.
///
/// Every element is first drawn uniformly from `[-1, 1]`. Then, walking the upper triangle row by
/// row, `diagonal_shift` is added to each diagonal element, and each off-diagonal element `(i, j)`
/// with `i < j` is shifted by a value drawn uniformly from `[0, sqrt(dimension))` and mirrored into
/// `(j, i)`.
pub struct SpdMat {
    /// Dimension of the sampled matrix.
    pub dimension: usize,
    /// Value added to every diagonal element.
    pub diagonal_shift: f64,
}

impl Distribution<Mat> for StandardMat {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Mat {
        let unit = Uniform::new_inclusive(-1.0, 1.0);
        Mat::from_fn(self.nrows, self.ncols, |_, _| unit.sample(rng))
    }
}

impl SpdMat {
    /// Returns a distribution whose samples are strictly diagonally dominant, hence positive
    /// definite, for every `dimension`.
    ///
    /// Off-diagonal elements lie in `[-1, 1 + sqrt(n))`, so a diagonal shift of
    /// `n * (1 + sqrt(n))` exceeds the sum of the absolute values of the off-diagonal elements of
    /// any row, even after the `[-1, 1]` noise.
    pub fn new(dimension: usize) -> Self {
        let n = dimension as f64;
        Self {
            dimension,
            diagonal_shift: n * (1.0 + n.sqrt()),
        }
    }

    /// Returns a distribution that shifts the diagonal by `dimension` only.
    ///
    /// The off-diagonal noise grows faster than the diagonal, so rows are not diagonally
    /// dominant, but the samples are positive definite with high probability once the dimension
    /// is in the tens. Small dimensions may produce matrices that fail to factorize.
    pub fn classic(dimension: usize) -> Self {
        Self {
            dimension,
            diagonal_shift: dimension as f64,
        }
    }

    /// Overwrites `dst` with a sample of the distribution.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is not a `dimension × dimension` matrix.
    #[track_caller]
    pub fn fill<R: Rng + ?Sized>(&self, dst: &mut Mat, rng: &mut R) {
        let n = self.dimension;
        assert!(dst.shape() == (n, n));
        if n == 0 {
            return;
        }

        let unit = Uniform::new_inclusive(-1.0, 1.0);
        for x in dst.as_mut_slice() {
            *x = unit.sample(rng);
        }

        let shift = Uniform::new(0.0, (n as f64).sqrt());
        for i in 0..n {
            dst[(i, i)] += self.diagonal_shift;
            for j in i + 1..n {
                let x = dst[(i, j)] + shift.sample(rng);
                dst[(i, j)] = x;
                dst[(j, i)] = x;
            }
        }
    }
}

impl Distribution<Mat> for SpdMat {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Mat {
        let mut mat = Mat::zeros(self.dimension, self.dimension);
        self.fill(&mut mat, rng);
        mat
    }
}
