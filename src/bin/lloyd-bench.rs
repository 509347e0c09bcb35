use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use lloyd_bench::harness::ReportEntry;
use lloyd_bench::*;
use rand::prelude::*;
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendChoice {
    Reference,
    Vectorized,
    Native,
    Accelerated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum InitChoice {
    RandomSample,
    FirstK,
}

#[derive(Debug, Parser)]
#[command(about = "Time exact integer k-means across interchangeable backends")]
struct Args {
    /// Platform the accelerated backend runs on (simulated, echo)
    #[arg(long, default_value = "simulated")]
    platform: PlatformKind,

    #[arg(long, default_value_t = 1024)]
    num_rows: usize,

    #[arg(long, default_value_t = 2)]
    dim: usize,

    #[arg(long, default_value_t = 30)]
    iteration_limit: usize,

    #[arg(long, default_value_t = 2)]
    num_centroids: usize,

    /// Coordinates are drawn from [-element-max, element-max)
    #[arg(long, default_value_t = 99)]
    element_max: i64,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, value_enum, default_value = "random-sample")]
    init: InitChoice,

    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [
        BackendChoice::Reference, BackendChoice::Vectorized, BackendChoice::Native, BackendChoice::Accelerated])]
    backends: Vec<BackendChoice>,

    /// Points per work unit of the native backend
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Time to wait for the accelerator before giving up
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report {
    num_rows: usize,
    dim: usize,
    num_centroids: usize,
    iteration_limit: usize,
    seed: u64,
    initial_centroids: Vec<Vec<i64>>,
    results: Vec<ReportEntry>,
}

fn backend(choice: BackendChoice, args: &Args) -> Backend {
    match choice {
        BackendChoice::Reference => Backend::Reference,
        BackendChoice::Vectorized => Backend::Vectorized,
        BackendChoice::Native => Backend::Native(Native::with_chunk_size(args.chunk_size)),
        BackendChoice::Accelerated => Backend::Accelerated(
            Accelerated::new(args.platform).timeout(Duration::from_millis(args.timeout_ms))),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let points = datagen::uniform_points(args.num_rows, args.dim, args.element_max, args.seed)
        .context("generating points")?;
    let initial = match args.init {
        InitChoice::RandomSample => inits::random_sample(&points, args.num_centroids, &mut StdRng::seed_from_u64(args.seed)),
        InitChoice::FirstK => inits::first_k(&points, args.num_centroids),
    }.context("choosing initial centroids")?;
    info!(rows = points.len(), dims = points.dims(), k = initial.k, "input ready");

    let backends: Vec<Backend> = args.backends.iter().map(|&c| backend(c, &args)).collect();
    let records = BenchmarkHarness::new(&points, &initial, args.iteration_limit).run(&backends);

    if args.json {
        let report = Report {
            num_rows: args.num_rows,
            dim: args.dim,
            num_centroids: args.num_centroids,
            iteration_limit: args.iteration_limit,
            seed: args.seed,
            initial_centroids: initial.to_rows(),
            results: records.iter().map(BenchmarkRecord::report).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{:<12} {:>12} {:>10} {:<14} centroids", "backend", "seconds", "iterations", "termination");
        for record in &records {
            match &record.result {
                Ok(m) => println!("{:<12} {:>12.6} {:>10} {:<14} {:?}", record.backend, m.elapsed.as_secs_f64(),
                    m.outcome.iterations, format!("{:?}", m.outcome.termination), m.outcome.centroids.to_rows()),
                Err(err) => println!("{:<12} failed: {}", record.backend, err),
            }
        }
    }

    let failed: Vec<_> = records.iter().filter(|r| r.result.is_err()).map(|r| r.backend).collect();
    if !failed.is_empty() {
        bail!("backends failed: {}", failed.join(", "));
    }
    if let Some(first) = records.first() {
        let disagreeing: Vec<_> = records.iter().filter(|r| r.centroids() != first.centroids()).map(|r| r.backend).collect();
        if !disagreeing.is_empty() {
            bail!("centroids of {} differ from {}", disagreeing.join(", "), first.backend);
        }
    }
    Ok(())
}
