use crate::Parallelism;
use rayon::prelude::*;

/// Executes the two operations, possibly in parallel, while splitting the amount of parallelism
/// between the two.
#[inline]
pub fn join_raw<A: Send, B: Send>(
    op_a: impl Send + FnOnce(Parallelism) -> A,
    op_b: impl Send + FnOnce(Parallelism) -> B,
    parallelism: Parallelism,
) -> (A, B) {
    match parallelism {
        Parallelism::None => (op_a(parallelism), op_b(parallelism)),
        Parallelism::Rayon(n_threads) => {
            if n_threads == 1 {
                (op_a(Parallelism::None), op_b(Parallelism::None))
            } else {
                let n_threads = if n_threads > 0 {
                    n_threads
                } else {
                    rayon::current_num_threads()
                };
                let parallelism = Parallelism::Rayon(n_threads - n_threads / 2);
                rayon::join(|| op_a(parallelism), || op_b(parallelism))
            }
        }
    }
}

/// Calls `op(idx, &mut slice[idx])` for every element of `slice`, possibly in parallel.
///
/// Each element is handed to exactly one task, so `op` may write to it without synchronization.
/// With rayon parallelism, work is distributed dynamically in chunks of at least `min_len`
/// elements.
#[inline]
pub fn for_each_mut<T: Send>(
    slice: &mut [T],
    min_len: usize,
    op: impl Send + Sync + Fn(usize, &mut T),
    parallelism: Parallelism,
) {
    match parallelism {
        Parallelism::None => {
            for (idx, x) in slice.iter_mut().enumerate() {
                op(idx, x);
            }
        }
        Parallelism::Rayon(_) => {
            slice
                .par_iter_mut()
                .enumerate()
                .with_min_len(min_len.max(1))
                .for_each(|(idx, x)| op(idx, x));
        }
    }
}

/// Calls `op(i, row)` for every row of the row-major buffer `data` with rows of length `ncols`,
/// possibly in parallel.
///
/// With rayon parallelism, rows are distributed dynamically in chunks of at least `min_len`
/// rows.
#[inline]
pub fn for_each_row_mut<T: Send>(
    data: &mut [T],
    ncols: usize,
    min_len: usize,
    op: impl Send + Sync + Fn(usize, &mut [T]),
    parallelism: Parallelism,
) {
    if ncols == 0 {
        return;
    }
    match parallelism {
        Parallelism::None => {
            for (i, row) in data.chunks_exact_mut(ncols).enumerate() {
                op(i, row);
            }
        }
        Parallelism::Rayon(_) => {
            data.par_chunks_exact_mut(ncols)
                .enumerate()
                .with_min_len(min_len.max(1))
                .for_each(|(i, row)| op(i, row));
        }
    }
}

/// Maps every index in `0..n` with `map`, then combines the results with the associative
/// operation `combine`, starting from `identity`.
///
/// With [`Parallelism::None`] this is a left fold in index order. With rayon, every worker
/// folds its own partition into a local accumulator and the partial results are combined at the
/// end, in an unspecified order.
#[inline]
pub fn map_reduce<T: Send>(
    n: usize,
    identity: impl Send + Sync + Fn() -> T,
    map: impl Send + Sync + Fn(usize) -> T,
    combine: impl Send + Sync + Fn(T, T) -> T,
    parallelism: Parallelism,
) -> T {
    match parallelism {
        Parallelism::None => (0..n).fold(identity(), |acc, idx| combine(acc, map(idx))),
        Parallelism::Rayon(_) => (0..n)
            .into_par_iter()
            .fold(&identity, |acc, idx| combine(acc, map(idx)))
            .reduce(&identity, &combine),
    }
}

/// Sums `f(idx)` for `idx` in `0..n`.
#[inline]
pub fn sum(n: usize, f: impl Send + Sync + Fn(usize) -> f64, parallelism: Parallelism) -> f64 {
    map_reduce(n, || 0.0, f, |a, b| a + b, parallelism)
}

/// The amount of threads that should ideally execute an operation with the given parallelism.
#[inline]
pub fn parallelism_degree(parallelism: Parallelism) -> usize {
    match parallelism {
        Parallelism::None => 1,
        Parallelism::Rayon(0) => rayon::current_num_threads(),
        Parallelism::Rayon(n_threads) => n_threads,
    }
}

/// Returns the start and length of a subsegment of `0..n`, split between `chunk_count` consumers,
/// for the consumer at index `idx`.
///
/// For the same `n` and `chunk_count`, different values of `idx` between in `0..chunk_count` will
/// represent distinct subsegments.
#[inline]
pub fn par_split_indices(n: usize, idx: usize, chunk_count: usize) -> (usize, usize) {
    let chunk_size = n / chunk_count;
    let rem = n % chunk_count;

    let idx_to_col_start = move |idx| {
        if idx < rem {
            idx * (chunk_size + 1)
        } else {
            rem + idx * chunk_size
        }
    };

    let start = idx_to_col_start(idx);
    let end = idx_to_col_start(idx + 1);
    (start, end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_indices_cover_range() {
        for n in [0, 1, 7, 64, 100] {
            for chunk_count in 1..9 {
                let mut next = 0;
                for idx in 0..chunk_count {
                    let (start, len) = par_split_indices(n, idx, chunk_count);
                    assert_eq!(start, next);
                    next = start + len;
                }
                assert_eq!(next, n);
            }
        }
    }

    #[test]
    fn test_for_each_mut_disjoint_writes() {
        for par in [Parallelism::None, Parallelism::Rayon(4)] {
            let mut v = vec![0usize; 257];
            for_each_mut(&mut v, 16, |idx, x| *x = 2 * idx, par);
            assert!(v.iter().enumerate().all(|(idx, &x)| x == 2 * idx));
        }
    }

    #[test]
    fn test_for_each_row_mut() {
        for par in [Parallelism::None, Parallelism::Rayon(0)] {
            let mut v = vec![0usize; 12];
            for_each_row_mut(&mut v, 4, 1, |i, row| row.fill(i), par);
            assert_eq!(v, [0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
        }
    }

    #[test]
    fn test_reductions_agree() {
        let f = |idx: usize| 1.0 / (idx as f64 + 1.0);
        let seq = sum(10_000, f, Parallelism::None);
        let par = sum(10_000, f, Parallelism::Rayon(0));
        assert!((seq - par).abs() <= 1e-12 * seq.abs());

        let count = map_reduce(
            1000,
            || 0usize,
            |idx| (idx % 3 == 0) as usize,
            |a, b| a + b,
            Parallelism::Rayon(2),
        );
        assert_eq!(count, 334);
    }

    #[test]
    fn test_join_raw_returns_both() {
        for par in [Parallelism::None, Parallelism::Rayon(1), Parallelism::Rayon(0)] {
            let (a, b) = join_raw(|_| 1, |_| "two", par);
            assert_eq!((a, b), (1, "two"));
        }
    }
}
