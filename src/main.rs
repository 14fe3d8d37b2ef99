use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use nipt_concordance::{config::EvalConfig, csv_reader, pipeline};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nipt-concordance")]
#[command(version)]
#[command(about = "Genotype concordance of direct and imputed calls against a ground-truth panel", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Number of threads for parallel processing
    #[arg(long, global = true, default_value_t = num_cpus())]
    threads: usize,

    /// Suppress progress output and logging
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Count ground-truth genotypes per chromosome, sample and MAF bin
    Census {
        /// JSON evaluation config
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Score every run against the ground truth, then write the reports
    Evaluate {
        /// JSON evaluation config
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Rebuild the reports from tables written by a previous evaluation
    Summarize {
        /// JSON evaluation config
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

macro_rules! progress {
    ($quiet:expr) => {
        if !$quiet {
            eprintln!();
        }
    };
    ($quiet:expr, $($arg:tt)*) => {
        if !$quiet {
            eprintln!($($arg)*);
        }
    };
}

fn make_progress_bar(quiet: bool, len: u64) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("  [{elapsed_precise}/{eta_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    pb
}

fn init_log(quiet: bool, verbose: u8) -> Result<()> {
    // warn is always on unless --quiet
    stderrlog::new()
        .quiet(quiet)
        .verbosity(1 + verbose as usize)
        .init()
        .context("Failed to initialise logging")
}

fn load_config(path: &Path, quiet: bool) -> Result<EvalConfig> {
    let config = EvalConfig::load(path)?;
    progress!(quiet, "Config: {}", path.display());
    progress!(quiet, "  Chromosomes: {}", config.chromosomes.join(", "));
    progress!(quiet, "  MAF floor: {}", config.min_maf);
    progress!(quiet, "  Runs: {}", config.runs.len());
    progress!(quiet, "  Output directory: {}", config.output_dir.display());
    progress!(quiet);
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_log(args.quiet, args.verbose)?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Failed to configure thread pool")?;

    progress!(args.quiet, "NIPT Genotype Concordance");
    progress!(args.quiet, "=========================================");

    match &args.command {
        Command::Census { config } => run_census(&args, config),
        Command::Evaluate { config } => run_evaluate(&args, config),
        Command::Summarize { config } => run_summarize(&args, config),
    }
}

fn run_census(args: &Args, config_path: &Path) -> Result<()> {
    let config = load_config(config_path, args.quiet)?;

    progress!(args.quiet, "Counting ground-truth genotypes...");
    let pb = make_progress_bar(args.quiet, config.chromosomes.len() as u64);
    let census = pipeline::build_census(&config, Some(&pb))?;
    pb.finish_and_clear();

    progress!(args.quiet, "  Samples: {}", census.sample_totals().len());
    progress!(args.quiet, "Done! Census written to: {}", config.census.display());
    Ok(())
}

fn run_evaluate(args: &Args, config_path: &Path) -> Result<()> {
    let config = load_config(config_path, args.quiet)?;

    // Fail before the long scoring pass if the census is unusable.
    let census = csv_reader::load_census(&config.census)?;

    progress!(args.quiet, "Step 1: Scoring calls against the ground truth...");
    let units = (config.chromosomes.len() * config.runs.len()) as u64;
    let pb = make_progress_bar(args.quiet, units);
    let failures = pipeline::evaluate(&config, Some(&pb));
    pb.finish_and_clear();
    progress!(args.quiet, "  Units scored: {} / {}", units - failures.len() as u64, units);

    progress!(args.quiet, "Step 2: Aggregating reports...");
    let failures = pipeline::summarize(&config, &census, failures)?;
    report_exclusions(args.quiet, &config, failures.len());
    Ok(())
}

fn run_summarize(args: &Args, config_path: &Path) -> Result<()> {
    let config = load_config(config_path, args.quiet)?;
    let census = csv_reader::load_census(&config.census)?;

    progress!(args.quiet, "Aggregating reports from saved tables...");
    let failures = pipeline::summarize(&config, &census, Vec::new())?;
    report_exclusions(args.quiet, &config, failures.len());
    Ok(())
}

fn report_exclusions(quiet: bool, config: &EvalConfig, excluded: usize) {
    progress!(quiet, "  Excluded units: {}", excluded);
    progress!(quiet);
    progress!(quiet, "Done! Reports written to: {}", config.output_dir.display());
}
