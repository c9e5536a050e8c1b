use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{debug, info, warn};
use spd_chol::{
    demo::{time_seed, CholeskyDemo, DemoReport, Generator, Stage},
    Parallelism,
};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "spd-chol",
    version = env!("CARGO_PKG_VERSION"),
    about = "Factorizes a random symmetric positive definite matrix and checks the result",
    after_help = r#"
Environment Variables:
  SPD_CHOL_THREADS=<n>         Number of worker threads (0: one per core)
  SPD_CHOL_STRATEGY=<s>        sequential, parallel or both
  SPD_CHOL_SEED=<seed>         Seed of the random matrix generator
  SPD_CHOL_GENERATOR=<g>       dominant or classic
  SPD_CHOL_LOG_LEVEL=<level>   Log level (error, warn, info, debug, trace)
"#
)]
struct Cli {
    /// Dimension of the square matrices
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    dimension: u64,

    /// Number of worker threads, 0 uses one thread per core
    #[arg(short, long, env = "SPD_CHOL_THREADS", default_value = "0")]
    threads: usize,

    /// Execution strategy
    #[arg(long, value_enum, env = "SPD_CHOL_STRATEGY", default_value = "parallel")]
    strategy: Strategy,

    /// Seed of the random matrix generator, derived from the current time if omitted
    #[arg(long, env = "SPD_CHOL_SEED")]
    seed: Option<u64>,

    /// Recipe used to generate the source matrix
    #[arg(long, value_enum, env = "SPD_CHOL_GENERATOR", default_value = "dominant")]
    generator: GeneratorArg,

    /// Set log level
    #[arg(long, value_enum, env = "SPD_CHOL_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Strategy {
    /// Run every stage on the calling thread
    Sequential,
    /// Run every stage on the worker pool
    Parallel,
    /// Run the sequential and parallel pipelines on the same matrix and compare their timings
    Both,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GeneratorArg {
    /// Strictly diagonally dominant matrices
    Dominant,
    /// Diagonal shifted by the dimension only
    Classic,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn speedup(sequential: Duration, parallel: Duration) -> Option<f64> {
    (!parallel.is_zero()).then(|| sequential.as_secs_f64() / parallel.as_secs_f64())
}

fn run(demo: CholeskyDemo, label: &str) -> Result<DemoReport> {
    info!("{label} run, dimension {}", demo.dimension());
    demo.run().with_context(|| format!("{label} run failed"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .filter_level(cli.log_level.into())
        .init();

    let dimension =
        usize::try_from(cli.dimension).context("dimension does not fit in the address space")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build()
        .context("failed to build the worker pool")?;
    info!("{} threads", pool.current_num_threads());

    let generator = match cli.generator {
        GeneratorArg::Dominant => Generator::Dominant,
        GeneratorArg::Classic => Generator::Classic,
    };
    let seed = cli.seed.unwrap_or_else(time_seed);
    debug!("seed: {seed}");

    let demo = CholeskyDemo::new(dimension)
        .with_seed(seed)
        .with_generator(generator);
    let sequential = demo.with_parallelism(Parallelism::None);
    let parallel = demo.with_parallelism(Parallelism::Rayon(0));

    let reports = pool.install(|| -> Result<Vec<DemoReport>> {
        Ok(match cli.strategy {
            Strategy::Sequential => vec![run(sequential, "Sequential")?],
            Strategy::Parallel => vec![run(parallel, "Parallel")?],
            Strategy::Both => vec![
                run(sequential, "Sequential")?,
                run(parallel, "Parallel")?,
            ],
        })
    })?;

    if let [seq, par] = reports.as_slice() {
        let stage = Stage::Factorization;
        if let Some(ratio) = seq
            .elapsed(stage)
            .zip(par.elapsed(stage))
            .and_then(|(t_seq, t_par)| speedup(t_seq, t_par))
        {
            info!("{stage} speedup: {ratio:.2}");
        }
        if let Some(ratio) = speedup(seq.total(), par.total()) {
            info!("total speedup: {ratio:.2}");
        }
    }

    let mismatches: usize = reports.iter().map(|report| report.mismatches).sum();
    if mismatches != 0 {
        warn!("{mismatches} mismatched elements in total");
    }

    Ok(())
}
