use crate::{
    utils::thread::{join_raw, map_reduce, par_split_indices, parallelism_degree},
    Parallelism,
};

/// Below this length, [`argmax_divide_and_conquer`] scans the slice directly.
pub const DIVIDE_AND_CONQUER_LEAF_LEN: usize = 1000;

/// Recursion depth below which [`argmax_divide_and_conquer`] stops forking parallel tasks.
pub const DIVIDE_AND_CONQUER_PARALLEL_DEPTH: usize = 4;

/// Position and value of the largest element of a slice.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ArgMax<T> {
    /// Index of the first occurrence of the largest element.
    pub index: usize,
    /// The largest element.
    pub value: T,
}

impl<T: PartialOrd + Copy> ArgMax<T> {
    /// Combines the results of two adjacent segments, `self` being the leftmost one.
    ///
    /// Ties are resolved in favor of `self`, so the first occurrence of the maximum wins.
    #[inline]
    pub fn combine(self, right: Self) -> Self {
        if right.value > self.value {
            right
        } else {
            self
        }
    }
}

fn combine_opt<T: PartialOrd + Copy>(
    left: Option<ArgMax<T>>,
    right: Option<ArgMax<T>>,
) -> Option<ArgMax<T>> {
    match (left, right) {
        (Some(left), Some(right)) => Some(left.combine(right)),
        (left, None) => left,
        (None, right) => right,
    }
}

fn scan<T: PartialOrd + Copy>(data: &[T], offset: usize) -> Option<ArgMax<T>> {
    let (&first, rest) = data.split_first()?;
    let mut best = ArgMax {
        index: offset,
        value: first,
    };
    for (idx, &x) in rest.iter().enumerate() {
        if x > best.value {
            best = ArgMax {
                index: offset + 1 + idx,
                value: x,
            };
        }
    }
    Some(best)
}

/// Returns the index and value of the largest element of `data`, scanning it sequentially, or
/// `None` if `data` is empty.
///
/// Elements that are not comparable with the current maximum (e.g. NaN) are skipped, except for
/// the first one.
pub fn argmax_sequential<T: PartialOrd + Copy>(data: &[T]) -> Option<ArgMax<T>> {
    scan(data, 0)
}

/// Returns the index and value of the largest element of `data`, or `None` if `data` is empty.
///
/// The slice is split into one contiguous partition per thread. Each partition is scanned into
/// a local accumulator, and the partial results are combined left to right, so the result is the
/// same as [`argmax_sequential`].
pub fn argmax<T: PartialOrd + Copy + Send + Sync>(
    data: &[T],
    parallelism: Parallelism,
) -> Option<ArgMax<T>> {
    let chunk_count = parallelism_degree(parallelism).min(data.len()).max(1);

    map_reduce(
        chunk_count,
        || None,
        |idx| {
            let (start, len) = par_split_indices(data.len(), idx, chunk_count);
            scan(&data[start..start + len], start)
        },
        combine_opt,
        parallelism,
    )
}

/// Returns the index and value of the largest element of `data`, or `None` if `data` is empty.
///
/// The slice is halved recursively, and both halves are processed as independent tasks for the
/// first [`DIVIDE_AND_CONQUER_PARALLEL_DEPTH`] levels of the recursion. Segments shorter than
/// [`DIVIDE_AND_CONQUER_LEAF_LEN`] are scanned directly.
pub fn argmax_divide_and_conquer<T: PartialOrd + Copy + Send + Sync>(
    data: &[T],
    parallelism: Parallelism,
) -> Option<ArgMax<T>> {
    fn implementation<T: PartialOrd + Copy + Send + Sync>(
        data: &[T],
        offset: usize,
        depth: usize,
        parallelism: Parallelism,
    ) -> Option<ArgMax<T>> {
        if data.len() <= DIVIDE_AND_CONQUER_LEAF_LEN {
            return scan(data, offset);
        }

        let mid = data.len() / 2;
        let (left, right) = data.split_at(mid);
        let parallelism = if depth < DIVIDE_AND_CONQUER_PARALLEL_DEPTH {
            parallelism
        } else {
            Parallelism::None
        };

        let (left, right) = join_raw(
            |par| implementation(left, offset, depth + 1, par),
            |par| implementation(right, offset + mid, depth + 1, par),
            parallelism,
        );
        combine_opt(left, right)
    }

    implementation(data, 0, 0, parallelism)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_with_sentinel(len: usize, seed: u64) -> (Vec<f32>, usize) {
        let rng = &mut StdRng::seed_from_u64(seed);
        let mut data: Vec<f32> = (0..len).map(|_| rng.gen::<f32>() * 1000.0).collect();
        let special = rng.gen_range(0..len);
        data[special] = 10000.0;
        (data, special)
    }

    #[test]
    fn test_strategies_agree_on_sentinel() {
        for len in [1, 2, 999, 1000, 1001, 12_345, 1_000_000] {
            let (data, special) = random_with_sentinel(len, len as u64);
            let expected = ArgMax {
                index: special,
                value: 10000.0,
            };

            assert_eq!(argmax_sequential(&data), Some(expected));
            for par in [Parallelism::None, Parallelism::Rayon(0), Parallelism::Rayon(3)] {
                assert_eq!(argmax(&data, par), Some(expected));
                assert_eq!(argmax_divide_and_conquer(&data, par), Some(expected));
            }
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut data = vec![0.0f64; 5000];
        data[1234] = 1.0;
        data[4321] = 1.0;
        let expected = Some(ArgMax {
            index: 1234,
            value: 1.0,
        });
        assert_eq!(argmax_sequential(&data), expected);
        assert_eq!(argmax(&data, Parallelism::Rayon(7)), expected);
        assert_eq!(argmax_divide_and_conquer(&data, Parallelism::Rayon(0)), expected);
    }

    #[test]
    fn test_empty() {
        let data: [f32; 0] = [];
        assert_eq!(argmax_sequential(&data), None);
        assert_eq!(argmax(&data, Parallelism::Rayon(0)), None);
        assert_eq!(argmax_divide_and_conquer(&data, Parallelism::None), None);
    }
}
