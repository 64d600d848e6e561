use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::error;
use uloop::asset::Microcode;
use uloop::driver::{self, DEFAULT_CYCLE_BUDGET, RunConfig, RunOutcome};
use uloop::error::AssetLoadError;
use uloop::executor::{Executor, SwappedStrides, Uloop};
use uloop::sweep::{self, SweepConfig, SweepReport};

#[derive(Parser)]
#[command(name = "uloop-check", about = "Differential checker for the uLoop nested-loop controller")]
struct Cli {
    /// Microcode asset (YAML). Defaults to the built-in single-loop program.
    #[arg(long)]
    asset: Option<PathBuf>,

    /// Which datapath to check (uloop, swapped-strides).
    #[arg(long, default_value = "uloop")]
    executor: String,

    /// Check this single iteration count instead of sweeping the matrix.
    #[arg(long)]
    nb_iter: Option<u32>,

    /// Stride of a/b for a single check.
    #[arg(long, default_value_t = 1)]
    iter_stride: i64,

    /// Stride of c/d for a single check.
    #[arg(long, default_value_t = 1)]
    one_stride: i64,

    /// Cycles a run may take before it is reported as hung.
    #[arg(long, default_value_t = DEFAULT_CYCLE_BUDGET)]
    cycle_budget: usize,

    /// Dump controller state and registers at every cycle.
    #[arg(long)]
    verbose: bool,

    /// Check N seeded random configurations instead of the fixed matrix.
    #[arg(long)]
    random: Option<usize>,

    /// Seed for --random.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print the disassembled microcode and exit.
    #[arg(long)]
    disassemble: bool,
}

fn main() {
    // Override with RUST_LOG, e.g. `RUST_LOG=debug` to also see stall cycles.
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let microcode = match load(&cli) {
        Ok(mc) => mc,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if cli.disassemble {
        print!("{}", microcode.disassemble());
        return;
    }

    let result = match cli.executor.as_str() {
        "uloop" => dispatch::<Uloop>(&cli, &microcode),
        "swapped-strides" => dispatch::<SwappedStrides>(&cli, &microcode),
        other => {
            eprintln!("Unknown executor: {other}. Available: uloop, swapped-strides");
            std::process::exit(1);
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<Microcode, AssetLoadError> {
    match cli.asset {
        Some(ref path) => Microcode::load(path),
        None => Microcode::builtin(),
    }
}

/// Run the requested check. Returns whether everything passed.
fn dispatch<E: Executor>(cli: &Cli, microcode: &Microcode) -> Result<bool, AssetLoadError> {
    if let Some(nb_iter) = cli.nb_iter {
        let config = RunConfig::new(nb_iter, cli.iter_stride, cli.one_stride)
            .cycle_budget(cli.cycle_budget)
            .verbose(cli.verbose);
        let outcome = driver::check::<E>(microcode, config)?;
        print_outcome(&outcome);
        return Ok(outcome.passed());
    }

    let report = match cli.random {
        Some(count) => sweep::random_sweep::<E>(microcode, cli.seed, count, cli.cycle_budget)?,
        None => {
            let config = SweepConfig {
                cycle_budget: cli.cycle_budget,
                ..Default::default()
            };
            sweep::sweep::<E>(microcode, &config)?
        }
    };
    report_sweep::<E>(&report, microcode)
}

fn print_outcome(outcome: &RunOutcome) {
    println!("> Config {}", outcome.config);
    println!("{outcome}");
}

fn report_sweep<E: Executor>(report: &SweepReport, microcode: &Microcode) -> Result<bool, AssetLoadError> {
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    let hung: Vec<&RunOutcome> = report.budget_exceeded().collect();
    if !hung.is_empty() {
        println!("{} configuration(s) never reached end:", hung.len());
        for outcome in hung {
            println!("  {}", outcome.config);
        }
    }

    if let Some(failing) = report.first_failing() {
        println!("First failing configuration: {}", failing.config);
        println!("Re-running with diagnostics:");
        let rerun = driver::check::<E>(microcode, failing.config.verbose(true))?;
        print_outcome(&rerun);
        return Ok(false);
    }

    println!("{} configuration(s) checked, {} errors", report.outcomes.len(), report.total_errors());
    Ok(report.passed())
}
