//! End-to-end factorization pipeline.
//!
//! A run allocates four `n × n` matrices, fills the source with a random symmetric positive
//! definite matrix, computes its upper Cholesky factor, transposes it into the lower factor,
//! multiplies both factors back together, and counts the elements of the product that differ
//! from the source. Every stage is timed and reported through the [`log`] facade.

use crate::{
    get_global_parallelism,
    linalg::cholesky::upper::{
        compute::cholesky_upper_to,
        reconstruct::reconstruct_to,
        transpose::triangular_transpose_to,
        verify::{count_mismatches, Tolerance},
        CholeskyError,
    },
    stats::SpdMat,
    AllocError, Mat, Parallelism, Side,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic timestamps used to measure the duration of each stage.
pub trait Clock {
    /// Returns the time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`Instant`].
#[derive(Copy, Clone, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for WallClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Stages of a run, in execution order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Allocation of the matrices and generation of the source matrix.
    Initialization,
    /// Computation of the upper Cholesky factor.
    Factorization,
    /// Computation of the lower factor from the upper factor.
    Transpose,
    /// Multiplication of the lower and upper factors.
    Reconstruction,
    /// Comparison of the product with the source matrix.
    Verification,
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Stage::Initialization => "Initialization",
            Stage::Factorization => "Cholesky",
            Stage::Transpose => "L=U'",
            Stage::Reconstruction => "B=LU",
            Stage::Verification => "Verification",
        })
    }
}

/// Measured duration of one stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StageTiming {
    /// The stage that was measured.
    pub stage: Stage,
    /// Its wall-clock duration.
    pub elapsed: Duration,
}

/// Recipe used to fill the source matrix.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Generator {
    /// [`SpdMat::new`]: strictly diagonally dominant for every dimension.
    #[default]
    Dominant,
    /// [`SpdMat::classic`]: diagonal shifted by the dimension only.
    Classic,
}

impl Generator {
    /// Returns the distribution for matrices of dimension `dimension`.
    pub fn distribution(self, dimension: usize) -> SpdMat {
        match self {
            Generator::Dominant => SpdMat::new(dimension),
            Generator::Classic => SpdMat::classic(dimension),
        }
    }
}

/// Errors that abort a run.
///
/// A reconstruction that does not match the source is not an error; it is reported through
/// [`DemoReport::mismatches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoError {
    /// The requested dimension is zero.
    InvalidDimension(usize),
    /// The matrices could not be allocated.
    Allocation(AllocError),
    /// A matrix of the workspace does not have the dimensions of the source matrix.
    ShapeMismatch {
        /// Dimension of the source matrix.
        dimension: usize,
        /// Shape of the offending matrix.
        found: (usize, usize),
    },
    /// The source matrix is not numerically positive definite.
    NotPositiveDefinite(CholeskyError),
}

impl core::fmt::Display for DemoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DemoError::InvalidDimension(n) => {
                write!(f, "invalid dimension {n}: the matrix dimension must be positive")
            }
            DemoError::Allocation(err) => write!(f, "could not allocate the matrices: {err}"),
            DemoError::ShapeMismatch { dimension, found: (nrows, ncols) } => write!(
                f,
                "expected a {dimension}×{dimension} matrix, found a {nrows}×{ncols} matrix"
            ),
            DemoError::NotPositiveDefinite(err) => write!(f, "factorization failed: {err}"),
        }
    }
}

impl std::error::Error for DemoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DemoError::InvalidDimension(_) | DemoError::ShapeMismatch { .. } => None,
            DemoError::Allocation(err) => Some(err),
            DemoError::NotPositiveDefinite(err) => Some(err),
        }
    }
}

impl From<AllocError> for DemoError {
    #[inline]
    fn from(err: AllocError) -> Self {
        DemoError::Allocation(err)
    }
}

impl From<CholeskyError> for DemoError {
    #[inline]
    fn from(err: CholeskyError) -> Self {
        DemoError::NotPositiveDefinite(err)
    }
}

/// The four matrices of a run.
///
/// All of them are allocated by [`Workspace::try_new`] and released together when the workspace
/// is dropped.
#[derive(Clone, Debug)]
pub struct Workspace {
    /// Symmetric positive definite input.
    pub source: Mat,
    /// Upper Cholesky factor of `source`.
    pub upper: Mat,
    /// Transpose of `upper`.
    pub lower: Mat,
    /// Product `lower × upper`.
    pub reconstruction: Mat,
}

impl Workspace {
    /// Allocates four zeroed `dimension × dimension` matrices.
    pub fn try_new(dimension: usize) -> Result<Self, DemoError> {
        if dimension == 0 {
            return Err(DemoError::InvalidDimension(dimension));
        }
        Ok(Self {
            source: Mat::try_zeros(dimension, dimension)?,
            upper: Mat::try_zeros(dimension, dimension)?,
            lower: Mat::try_zeros(dimension, dimension)?,
            reconstruction: Mat::try_zeros(dimension, dimension)?,
        })
    }

    /// Returns the dimension of the matrices.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.source.nrows()
    }

    /// Checks that every matrix is `dimension × dimension`, `dimension` being the number of rows
    /// of the source.
    pub fn check_shapes(&self) -> Result<(), DemoError> {
        let dimension = self.dimension();
        if dimension == 0 {
            return Err(DemoError::InvalidDimension(dimension));
        }
        for mat in [&self.source, &self.upper, &self.lower, &self.reconstruction] {
            if mat.shape() != (dimension, dimension) {
                return Err(DemoError::ShapeMismatch {
                    dimension,
                    found: mat.shape(),
                });
            }
        }
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoReport {
    /// Dimension of the matrices.
    pub dimension: usize,
    /// Seed of the random source, when it is known.
    pub seed: Option<u64>,
    /// Parallelism used by every stage.
    pub parallelism: Parallelism,
    /// Duration of each stage, in execution order.
    pub timings: Vec<StageTiming>,
    /// Number of elements of the reconstruction that are not within tolerance of the source.
    pub mismatches: usize,
}

impl DemoReport {
    /// Returns `true` if the reconstruction matches the source.
    #[inline]
    pub fn is_equal(&self) -> bool {
        self.mismatches == 0
    }

    /// Returns the duration of `stage`, if it ran.
    pub fn elapsed(&self, stage: Stage) -> Option<Duration> {
        self.timings
            .iter()
            .find(|timing| timing.stage == stage)
            .map(|timing| timing.elapsed)
    }

    /// Returns the sum of the durations of all stages.
    pub fn total(&self) -> Duration {
        self.timings.iter().map(|timing| timing.elapsed).sum()
    }
}

/// Configuration of a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CholeskyDemo {
    dimension: usize,
    parallelism: Parallelism,
    tolerance: Tolerance,
    seed: Option<u64>,
    generator: Generator,
}

/// Returns a seed derived from the current wall-clock time.
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_nanos() as u64)
        .unwrap_or_default()
}

struct Stopwatch<'a, C: ?Sized> {
    clock: &'a C,
    timings: Vec<StageTiming>,
}

impl<C: Clock + ?Sized> Stopwatch<'_, C> {
    fn time<T>(&mut self, stage: Stage, op: impl FnOnce() -> T) -> T {
        let start = self.clock.now();
        let out = op();
        let elapsed = self.clock.now().saturating_sub(start);
        log::info!("{stage}: {:.6}", elapsed.as_secs_f64());
        self.timings.push(StageTiming { stage, elapsed });
        out
    }
}

impl CholeskyDemo {
    /// Returns the default configuration for matrices of dimension `dimension`: global
    /// parallelism, default tolerance, time-derived seed, diagonally dominant generator.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            parallelism: get_global_parallelism(),
            tolerance: Tolerance::default(),
            seed: None,
            generator: Generator::default(),
        }
    }

    /// Sets the parallelism strategy of every stage.
    pub fn with_parallelism(self, parallelism: Parallelism) -> Self {
        Self {
            parallelism,
            ..self
        }
    }

    /// Sets the verification tolerance.
    pub fn with_tolerance(self, tolerance: Tolerance) -> Self {
        Self { tolerance, ..self }
    }

    /// Sets the seed of the random source used by [`CholeskyDemo::run`].
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    /// Sets the recipe used to fill the source matrix.
    pub fn with_generator(self, generator: Generator) -> Self {
        Self { generator, ..self }
    }

    /// Returns the dimension of the matrices.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns the parallelism strategy of every stage.
    #[inline]
    pub fn parallelism(&self) -> Parallelism {
        self.parallelism
    }

    /// Runs the pipeline with a [`StdRng`] seeded from the configured seed, or from the current
    /// time if there is none, and the [`WallClock`].
    pub fn run(&self) -> Result<DemoReport, DemoError> {
        let seed = self.seed.unwrap_or_else(time_seed);
        log::debug!("seed: {seed}");
        let mut report = self.run_with(&mut StdRng::seed_from_u64(seed), &WallClock::default())?;
        report.seed = Some(seed);
        Ok(report)
    }

    /// Runs the pipeline, drawing the source matrix from `rng` and timing the stages with
    /// `clock`.
    pub fn run_with<R: Rng + ?Sized, C: Clock + ?Sized>(
        &self,
        rng: &mut R,
        clock: &C,
    ) -> Result<DemoReport, DemoError> {
        let mut watch = Stopwatch {
            clock,
            timings: Vec::with_capacity(5),
        };
        let mut workspace = watch.time(Stage::Initialization, || {
            let mut workspace = Workspace::try_new(self.dimension)?;
            self.generator
                .distribution(self.dimension)
                .fill(&mut workspace.source, rng);
            Ok::<_, DemoError>(workspace)
        })?;
        self.process(&mut workspace, watch)
    }

    /// Runs every stage after initialization on the source matrix already stored in
    /// `workspace`, timing them with `clock`.
    ///
    /// The factors and the reconstruction are left in `workspace`.
    pub fn run_on<C: Clock + ?Sized>(
        &self,
        workspace: &mut Workspace,
        clock: &C,
    ) -> Result<DemoReport, DemoError> {
        let watch = Stopwatch {
            clock,
            timings: Vec::with_capacity(4),
        };
        self.process(workspace, watch)
    }

    fn process<C: Clock + ?Sized>(
        &self,
        workspace: &mut Workspace,
        mut watch: Stopwatch<'_, C>,
    ) -> Result<DemoReport, DemoError> {
        let par = self.parallelism;
        workspace.check_shapes()?;
        let n = workspace.dimension();
        log::debug!("dimension: {n}, parallelism: {par:?}");

        let Workspace {
            source,
            upper,
            lower,
            reconstruction,
        } = workspace;

        watch
            .time(Stage::Factorization, || cholesky_upper_to(upper, source, par))
            .map_err(|err| {
                log::error!("{err}");
                DemoError::from(err)
            })?;
        watch.time(Stage::Transpose, || {
            triangular_transpose_to(lower, upper, Side::Upper, par)
        });
        watch.time(Stage::Reconstruction, || {
            reconstruct_to(reconstruction, lower, upper, par)
        });
        let mismatches = watch.time(Stage::Verification, || {
            count_mismatches(source, reconstruction, self.tolerance, par)
        });

        if mismatches != 0 {
            log::warn!("Matrices are not equal");
        } else {
            log::info!("Matrices are equal");
        }
        log::info!("A==B?: {mismatches}");

        Ok(DemoReport {
            dimension: n,
            seed: None,
            parallelism: par,
            timings: watch.timings,
            mismatches,
        })
    }
}

/// Runs the whole pipeline for matrices of dimension `n`, with the global parallelism setting, a
/// seed derived from the current time, and the wall clock.
pub fn run_cholesky_demo(n: usize) -> Result<DemoReport, DemoError> {
    CholeskyDemo::new(n).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mat;
    use core::cell::Cell;

    /// Advances by one millisecond every time it is read.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        fn now(&self) -> Duration {
            let t = self.0.get();
            self.0.set(t + 1);
            Duration::from_millis(t)
        }
    }

    #[test]
    fn test_run_with_fixed_seed_and_clock() {
        let demo = CholeskyDemo::new(50).with_parallelism(Parallelism::Rayon(0));
        let clock = TickClock(Cell::new(0));
        let report = demo
            .run_with(&mut StdRng::seed_from_u64(0), &clock)
            .unwrap();

        assert!(report.is_equal());
        assert_eq!(report.dimension, 50);
        assert_eq!(report.seed, None);
        assert_eq!(
            report.timings.iter().map(|t| t.stage).collect::<Vec<_>>(),
            [
                Stage::Initialization,
                Stage::Factorization,
                Stage::Transpose,
                Stage::Reconstruction,
                Stage::Verification,
            ]
        );
        assert!(report
            .timings
            .iter()
            .all(|t| t.elapsed == Duration::from_millis(1)));
        assert_eq!(report.total(), Duration::from_millis(5));
        assert_eq!(
            report.elapsed(Stage::Factorization),
            Some(Duration::from_millis(1))
        );
    }

    #[test]
    fn test_stage_labels() {
        let labels = [
            Stage::Initialization,
            Stage::Factorization,
            Stage::Transpose,
            Stage::Reconstruction,
            Stage::Verification,
        ]
        .map(|stage| stage.to_string());
        assert_eq!(
            labels,
            ["Initialization", "Cholesky", "L=U'", "B=LU", "Verification"]
        );
    }

    #[test]
    fn test_run_records_seed() {
        let report = CholeskyDemo::new(10)
            .with_parallelism(Parallelism::None)
            .with_seed(1234)
            .run()
            .unwrap();
        assert_eq!(report.seed, Some(1234));
        assert_eq!(report.mismatches, 0);
        assert_eq!(report.parallelism, Parallelism::None);
    }

    #[test]
    fn test_run_cholesky_demo() {
        for n in [1, 2, 3, 64] {
            let report = run_cholesky_demo(n).unwrap();
            assert!(report.is_equal());
            assert!(report.seed.is_some());
            assert_eq!(report.timings.len(), 5);
        }
    }

    #[test]
    fn test_invalid_dimension() {
        assert_eq!(
            run_cholesky_demo(0).unwrap_err(),
            DemoError::InvalidDimension(0)
        );
    }

    #[test]
    fn test_allocation_failure() {
        let run = |n: usize| {
            CholeskyDemo::new(n)
                .run_with(&mut StdRng::seed_from_u64(0), &WallClock::default())
                .unwrap_err()
        };
        assert!(matches!(
            run(1 << 31),
            DemoError::Allocation(AllocError::SizeOverflow { .. })
        ));
        assert!(matches!(
            run(3 << 28),
            DemoError::Allocation(AllocError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_run_on_mismatched_workspace() {
        let mut workspace = Workspace::try_new(4).unwrap();
        workspace.source = mat![[4.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 1.0]];
        let err = CholeskyDemo::new(4)
            .run_on(&mut workspace, &WallClock::default())
            .unwrap_err();
        assert_eq!(
            err,
            DemoError::ShapeMismatch {
                dimension: 3,
                found: (4, 4),
            }
        );

        let mut workspace = Workspace::try_new(4).unwrap();
        workspace.reconstruction = Mat::zeros(4, 5);
        let err = CholeskyDemo::new(4)
            .run_on(&mut workspace, &WallClock::default())
            .unwrap_err();
        assert_eq!(
            err,
            DemoError::ShapeMismatch {
                dimension: 4,
                found: (4, 5),
            }
        );

        let mut workspace = Workspace::try_new(2).unwrap();
        workspace.source = Mat::zeros(0, 0);
        assert_eq!(
            CholeskyDemo::new(2)
                .run_on(&mut workspace, &WallClock::default())
                .unwrap_err(),
            DemoError::InvalidDimension(0)
        );
    }

    #[test]
    fn test_not_positive_definite() {
        let mut workspace = Workspace::try_new(3).unwrap();
        workspace.source = mat![[4.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, -1.0]];

        let err = CholeskyDemo::new(3)
            .run_on(&mut workspace, &WallClock::default())
            .unwrap_err();
        assert_eq!(
            err,
            DemoError::NotPositiveDefinite(CholeskyError {
                non_positive_definite_minor: 3,
            })
        );
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_run_on_four_by_four() {
        let mut workspace = Workspace::try_new(4).unwrap();
        workspace.source = mat![
            [5.0, 1.0, 1.0, 1.0],
            [1.0, 5.0, 1.0, 1.0],
            [1.0, 1.0, 5.0, 1.0],
            [1.0, 1.0, 1.0, 5.0],
        ];
        let report = CholeskyDemo::new(4)
            .with_parallelism(Parallelism::Rayon(2))
            .run_on(&mut workspace, &WallClock::default())
            .unwrap();
        assert_eq!(report.mismatches, 0);
        assert_eq!(report.timings.len(), 4);
        assert_eq!(workspace.lower, workspace.upper.transpose());
    }

    #[test]
    fn test_strategies_agree_on_same_seed() {
        let n = 120;
        let mut factors = Vec::new();
        for par in [Parallelism::None, Parallelism::Rayon(0)] {
            let mut workspace = Workspace::try_new(n).unwrap();
            Generator::Dominant
                .distribution(n)
                .fill(&mut workspace.source, &mut StdRng::seed_from_u64(99));
            let report = CholeskyDemo::new(n)
                .with_parallelism(par)
                .run_on(&mut workspace, &WallClock::default())
                .unwrap();
            assert!(report.is_equal());
            factors.push(workspace.upper);
        }
        for (&x, &y) in factors[0].as_slice().iter().zip(factors[1].as_slice()) {
            assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0));
        }
    }

    #[test]
    fn test_classic_generator() {
        let report = CholeskyDemo::new(300)
            .with_generator(Generator::Classic)
            .with_parallelism(Parallelism::Rayon(0))
            .with_seed(7)
            .run()
            .unwrap();
        assert!(report.is_equal());
    }
}
