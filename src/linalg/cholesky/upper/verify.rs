use crate::{utils::thread::map_reduce, Mat, Parallelism};
use equator::assert;

/// Default acceptance threshold, in percent of the reference value.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 0.001;

/// Acceptance threshold used when comparing a reconstruction against its reference.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerance {
    /// Largest accepted relative error, in percent of the reference value.
    ///
    /// When the reference value is exactly zero, the relative error is undefined, and the
    /// absolute error (also scaled by `100`) is compared against this threshold instead.
    pub percent: f64,
}

impl Default for Tolerance {
    #[inline]
    fn default() -> Self {
        Self {
            percent: DEFAULT_TOLERANCE_PERCENT,
        }
    }
}

impl Tolerance {
    /// Returns `true` if `actual` is within the tolerance of `expected`.
    ///
    /// A NaN on either side is never within the tolerance.
    #[inline]
    pub fn accepts(self, expected: f64, actual: f64) -> bool {
        let err = (actual - expected).abs();
        let err = if expected == 0.0 {
            err
        } else {
            err / expected.abs()
        };
        err * 100.0 <= self.percent
    }
}

/// Returns the number of elements of `reconstruction` that are not within `tolerance` of the
/// corresponding element of `source`.
///
/// A return value of `0` means the two matrices are equal up to the tolerance. Every element is
/// checked independently; with rayon parallelism, each worker counts the mismatches of its own
/// elements and the counts are summed at the end.
///
/// # Panics
///
/// Panics if the shapes of `source` and `reconstruction` differ.
#[track_caller]
pub fn count_mismatches(
    source: &Mat,
    reconstruction: &Mat,
    tolerance: Tolerance,
    parallelism: Parallelism,
) -> usize {
    assert!(source.shape() == reconstruction.shape());

    let a = source.as_slice();
    let b = reconstruction.as_slice();
    map_reduce(
        a.len(),
        || 0usize,
        |idx| (!tolerance.accepts(a[idx], b[idx])) as usize,
        |x, y| x + y,
        parallelism,
    )
}
