//! Owned dense matrix storage.

use equator::assert;

/// Errors that can occur while allocating a [`Mat`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The size in bytes of `nrows * ncols` elements exceeds `isize::MAX`.
    SizeOverflow {
        /// Requested number of rows.
        nrows: usize,
        /// Requested number of columns.
        ncols: usize,
    },
    /// The allocator could not provide the requested memory.
    OutOfMemory {
        /// Requested number of rows.
        nrows: usize,
        /// Requested number of columns.
        ncols: usize,
    },
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            AllocError::SizeOverflow { nrows, ncols } => {
                write!(f, "matrix size {nrows}×{ncols} overflows the address space")
            }
            AllocError::OutOfMemory { nrows, ncols } => {
                write!(f, "out of memory while allocating a {nrows}×{ncols} matrix")
            }
        }
    }
}

impl std::error::Error for AllocError {}

/// Heap allocated matrix of `f64`.
///
/// # Note
///
/// The memory layout of `Mat` is row-major and contiguous: the element at `(i, j)` lives at
/// offset `i * ncols + j` of [`Mat::as_slice`]. Each row is therefore a contiguous slice, which is
/// what allows the kernels to hand out disjoint rows to different threads.
///
/// Let us consider a 3×4 matrix
///
/// ```notcode
///  0 │ 1 │  2 │  3
/// ───┼───┼────┼───
///  4 │ 5 │  6 │  7
/// ───┼───┼────┼───
///  8 │ 9 │ 10 │ 11
/// ```
/// The memory representation of the data held by such a matrix is
///
/// ```notcode
/// 0 1 2 3 4 5 6 7 8 9 10 11
/// ```
#[derive(Clone, PartialEq)]
pub struct Mat {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl Mat {
    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with zeros.
    ///
    /// # Panics
    /// The function panics if the allocation fails. See [`Mat::try_zeros`] for a fallible
    /// version.
    #[track_caller]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        match Self::try_zeros(nrows, ncols) {
            Ok(mat) => mat,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with zeros, or an error if
    /// the memory could not be reserved.
    ///
    /// The zeros are written eagerly, so on systems that overcommit memory a reservation that
    /// succeeds can still exhaust physical memory while it is being filled.
    pub fn try_zeros(nrows: usize, ncols: usize) -> Result<Self, AllocError> {
        let len = nrows
            .checked_mul(ncols)
            .filter(|&len| {
                len.checked_mul(core::mem::size_of::<f64>())
                    .is_some_and(|bytes| bytes <= isize::MAX as usize)
            })
            .ok_or(AllocError::SizeOverflow { nrows, ncols })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| AllocError::OutOfMemory { nrows, ncols })?;
        data.resize(len, 0.0);

        Ok(Self { data, nrows, ncols })
    }

    /// Returns a new matrix with dimensions `(nrows, ncols)`, filled with the provided function.
    ///
    /// The function is called in row-major order.
    #[track_caller]
    pub fn from_fn(nrows: usize, ncols: usize, f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut f = f;
        let mut this = Self::zeros(nrows, ncols);
        for i in 0..nrows {
            for (j, dst) in this.row_mut(i).iter_mut().enumerate() {
                *dst = f(i, j);
            }
        }
        this
    }

    /// Returns a new matrix built from a list of rows of equal length.
    ///
    /// # Panics
    /// Panics if the rows do not all have the same length.
    #[track_caller]
    pub fn from_rows(rows: &[&[f64]]) -> Self {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |row| row.len());
        core::assert!(rows.iter().all(|row| row.len() == ncols));
        Self::from_fn(nrows, ncols, |i, j| rows[i][j])
    }

    /// Returns the number of rows of the matrix.
    #[inline(always)]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns of the matrix.
    #[inline(always)]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Returns `(nrows, ncols)`.
    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Returns `true` if the matrix has as many rows as columns.
    #[inline(always)]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Reads the value of the element at the given indices.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()` or `j >= self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn read(&self, i: usize, j: usize) -> f64 {
        assert!(all(i < self.nrows, j < self.ncols));
        self.data[i * self.ncols + j]
    }

    /// Writes the value to the element at the given indices.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()` or `j >= self.ncols()`.
    #[inline(always)]
    #[track_caller]
    pub fn write(&mut self, i: usize, j: usize, value: f64) {
        assert!(all(i < self.nrows, j < self.ncols));
        self.data[i * self.ncols + j] = value;
    }

    /// Returns the `i`-th row as a slice.
    #[inline]
    #[track_caller]
    pub fn row(&self, i: usize) -> &[f64] {
        assert!(i < self.nrows);
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Returns the `i`-th row as a mutable slice.
    #[inline]
    #[track_caller]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        assert!(i < self.nrows);
        &mut self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    /// Splits the matrix at row `i`, returning the finalized rows `0..i` as a read-only view and
    /// row `i` as a mutable slice.
    ///
    /// # Panics
    /// Panics if `i >= self.nrows()`.
    #[inline]
    #[track_caller]
    pub fn split_at_row_mut(&mut self, i: usize) -> (&[f64], &mut [f64]) {
        assert!(i < self.nrows);
        let ncols = self.ncols;
        let (head, tail) = self.data.split_at_mut(i * ncols);
        (head, &mut tail[..ncols])
    }

    /// Returns the underlying row-major storage.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns the underlying row-major storage, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Fills every element with `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Returns a new matrix holding the transpose of `self`.
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.ncols, self.nrows, |i, j| self.read(j, i))
    }
}

impl core::fmt::Debug for Mat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct Row<'a>(&'a [f64]);
        impl core::fmt::Debug for Row<'_> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_list().entries(self.0).finish()
            }
        }
        if self.ncols == 0 {
            return f.debug_list().finish();
        }
        f.debug_list()
            .entries(self.data.chunks_exact(self.ncols).map(Row))
            .finish()
    }
}

impl core::ops::Index<(usize, usize)> for Mat {
    type Output = f64;

    #[inline]
    #[track_caller]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(all(i < self.nrows, j < self.ncols));
        &self.data[i * self.ncols + j]
    }
}

impl core::ops::IndexMut<(usize, usize)> for Mat {
    #[inline]
    #[track_caller]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        assert!(all(i < self.nrows, j < self.ncols));
        &mut self.data[i * self.ncols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::{AllocError, Mat};

    #[test]
    fn test_layout_is_row_major() {
        let m = Mat::from_fn(3, 4, |i, j| (i * 4 + j) as f64);
        assert_eq!(m.shape(), (3, 4));
        for (idx, &x) in m.as_slice().iter().enumerate() {
            assert_eq!(x, idx as f64);
        }
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0, 7.0]);
        assert_eq!(m[(2, 3)], 11.0);
    }

    #[test]
    fn test_split_at_row() {
        let mut m = Mat::from_fn(3, 2, |i, j| (i * 2 + j) as f64);
        let (done, row) = m.split_at_row_mut(2);
        assert_eq!(done, &[0.0, 1.0, 2.0, 3.0]);
        row[0] = -1.0;
        assert_eq!(m.read(2, 0), -1.0);
    }

    #[test]
    fn test_size_overflow() {
        assert_eq!(
            Mat::try_zeros(usize::MAX, 2),
            Err(AllocError::SizeOverflow {
                nrows: usize::MAX,
                ncols: 2,
            }),
        );
    }

    #[test]
    fn test_byte_size_overflow() {
        // 2^62 elements fit in a usize, 2^65 bytes do not
        let n = 1usize << 31;
        assert_eq!(
            Mat::try_zeros(n, n),
            Err(AllocError::SizeOverflow { nrows: n, ncols: n }),
        );
        // 2^60 elements are 2^63 bytes, one past isize::MAX
        let n = 1usize << 30;
        assert_eq!(
            Mat::try_zeros(n, n),
            Err(AllocError::SizeOverflow { nrows: n, ncols: n }),
        );
    }

    #[test]
    fn test_out_of_memory() {
        // 2^62 bytes, addressable but larger than any virtual address space
        assert_eq!(
            Mat::try_zeros(1 << 30, 1 << 29),
            Err(AllocError::OutOfMemory {
                nrows: 1 << 30,
                ncols: 1 << 29,
            }),
        );
    }

    #[test]
    fn test_transpose() {
        let m = crate::mat![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let t = m.transpose();
        assert_eq!(t, crate::mat![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);
    }
}
