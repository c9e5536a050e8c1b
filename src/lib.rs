//! `spd-chol` computes the upper triangular Cholesky factor $U$ of a dense symmetric positive
//! definite matrix $A$, such that
//! $$A = U^\top U,$$
//! then rebuilds $A$ from the factor and checks the result.
//!
//! Every kernel takes a [`Parallelism`] argument selecting between a sequential and a rayon
//! backed execution of the same algorithm.
//!
//! # Example
//! ```
//! use spd_chol::{linalg::cholesky::upper, mat, Mat, Parallelism, Side};
//!
//! let a = mat![
//!     [5.0, 1.0, 1.0, 1.0],
//!     [1.0, 5.0, 1.0, 1.0],
//!     [1.0, 1.0, 5.0, 1.0],
//!     [1.0, 1.0, 1.0, 5.0],
//! ];
//! let par = Parallelism::None;
//!
//! let mut u = Mat::zeros(4, 4);
//! let mut l = Mat::zeros(4, 4);
//! let mut b = Mat::zeros(4, 4);
//! upper::compute::cholesky_upper_to(&mut u, &a, par).unwrap();
//! upper::transpose::triangular_transpose_to(&mut l, &u, Side::Upper, par);
//! upper::reconstruct::reconstruct_to(&mut b, &l, &u, par);
//!
//! let tol = upper::verify::Tolerance::default();
//! assert_eq!(upper::verify::count_mismatches(&a, &b, tol, par), 0);
//! ```

use core::sync::atomic::AtomicUsize;

pub mod demo;
pub mod linalg;
pub mod mat;
pub mod stats;
pub mod utils;

pub use demo::{run_cholesky_demo, CholeskyDemo, DemoError, DemoReport};
pub use mat::{AllocError, Mat};

/// Specifies whether the triangular lower or upper part of a matrix should be accessed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Lower half should be accessed.
    Lower,
    /// Upper half should be accessed.
    Upper,
}

/// Creates a [`Mat`] from its rows.
///
/// ```
/// use spd_chol::mat;
///
/// let matrix = mat![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
///
/// assert_eq!(matrix.read(1, 0), 3.0);
/// assert_eq!(matrix.nrows(), 3);
/// assert_eq!(matrix.ncols(), 2);
/// ```
#[macro_export]
macro_rules! mat {
    () => {
        $crate::mat::Mat::zeros(0, 0)
    };

    ($([$($v:expr),* $(,)?] ),+ $(,)?) => {
        {
            let rows: &[&[f64]] = &[$(&[$(($v) as f64),*]),+];
            $crate::mat::Mat::from_rows(rows)
        }
    };
}

/// Parallelism strategy that can be passed to every kernel in the library.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// No parallelism.
    ///
    /// The code is executed sequentially on the same thread that calls a function
    /// and passes this argument. Reductions are plain left folds, so results are reproducible
    /// bit for bit.
    None,
    /// Rayon parallelism.
    ///
    /// The code is possibly executed in parallel on the current thread, as well as the currently
    /// active rayon thread pool.
    ///
    /// The contained value represents a hint about the number of threads an implementation should
    /// use, but there is no way to guarantee how many or which threads will be used.
    ///
    /// A value of `0` treated as equivalent to `rayon::current_num_threads()`.
    Rayon(usize),
}

/// 0: None
/// n >= 1: Rayon(n - 1)
///
/// default: Rayon(0)
static GLOBAL_PARALLELISM: AtomicUsize = AtomicUsize::new(1);

/// Sets the global parallelism settings.
pub fn set_global_parallelism(parallelism: Parallelism) {
    let value = match parallelism {
        Parallelism::None => 0,
        Parallelism::Rayon(n) => n.saturating_add(1),
    };
    GLOBAL_PARALLELISM.store(value, core::sync::atomic::Ordering::Relaxed);
}

/// Gets the global parallelism settings.
pub fn get_global_parallelism() -> Parallelism {
    match GLOBAL_PARALLELISM.load(core::sync::atomic::Ordering::Relaxed) {
        0 => Parallelism::None,
        n => Parallelism::Rayon(n - 1),
    }
}

#[cfg(test)]
mod tests {
    use super::{get_global_parallelism, set_global_parallelism, Parallelism, GLOBAL_PARALLELISM};
    use core::sync::atomic::Ordering;

    #[test]
    fn test_global_parallelism_roundtrip() {
        let old = get_global_parallelism();

        set_global_parallelism(Parallelism::None);
        assert_eq!(get_global_parallelism(), Parallelism::None);
        set_global_parallelism(Parallelism::Rayon(3));
        assert_eq!(get_global_parallelism(), Parallelism::Rayon(3));
        set_global_parallelism(Parallelism::Rayon(0));
        assert_eq!(get_global_parallelism(), Parallelism::Rayon(0));
        set_global_parallelism(Parallelism::Rayon(usize::MAX));
        assert_eq!(get_global_parallelism(), Parallelism::Rayon(usize::MAX - 1));

        // every stored value decodes to a strategy
        for (raw, expected) in [
            (0, Parallelism::None),
            (1, Parallelism::Rayon(0)),
            (usize::MAX, Parallelism::Rayon(usize::MAX - 1)),
        ] {
            GLOBAL_PARALLELISM.store(raw, Ordering::Relaxed);
            assert_eq!(get_global_parallelism(), expected);
        }

        set_global_parallelism(old);
    }

    #[test]
    fn test_mat_macro() {
        let m = mat![[1, 2, 3], [4, 5, 6]];
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m.read(1, 2), 6.0);
    }
}
