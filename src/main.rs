use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

use trashday::{logging, reference_time, GitStatusChecker, Settings, SweepEngine, SweepOptions};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Move old, unmodified entries matching per-folder rules into a trash directory",
    long_about = None
)]
struct Args {
    /// Settings file (defaults to settings.yml beside the executable)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Show what would be moved without moving anything
    #[arg(long)]
    dry_run: bool,

    /// Log why each entry was kept or moved
    #[arg(long, short)]
    verbose: bool,

    /// Evaluate ages as of local midnight on this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    as_of: Option<String>,
}

fn run(args: &Args) -> Result<()> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };

    let settings = Settings::load(&config_path)?;
    let plan = settings.compile()?;
    let reference = reference_time(args.as_of.as_deref()).context("Invalid --as-of date")?;

    let checker = GitStatusChecker::default();
    let options = SweepOptions {
        dry_run: args.dry_run,
        quiet: false,
    };
    let report = SweepEngine::new(&plan, &checker, reference, options).run()?;

    println!();
    let moved = report.moved_count();
    let summary = if report.dry_run {
        format!("Would move {} of {} entries", moved, report.examined_count())
    } else {
        format!("Moved {} of {} entries", moved, report.examined_count())
    };
    println!("{}", summary.bold());

    let failed = report.failed_count();
    if failed > 0 {
        println!("{}", format!("{} moves failed", failed).red());
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
