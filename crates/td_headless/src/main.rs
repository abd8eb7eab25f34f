//! Headless tower-defense runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario and print a JSON report
//! cargo run -p td_headless -- run --scenario classic
//!
//! # Run a scenario file, writing the report to disk
//! cargo run -p td_headless -- run --scenario maps/maze.ron --output report.json
//!
//! # ASCII flow-field overlay after 40 ticks
//! cargo run -p td_headless -- paths --scenario classic --class air --ticks 40
//!
//! # Verify determinism
//! cargo run -p td_headless -- verify --scenario classic --runs 5
//!
//! # Interactive JSON-lines session
//! cargo run -p td_headless -- serve --scenario test
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use td_core::movement::MovementClass;
use td_headless::{
    ascii_visualizer::{render_all, render_paths, AsciiConfig},
    runner::{run_scenario, verify_scenario, ScenarioRunner},
    scenario::{Scenario, ScenarioError},
    session::Session,
};

#[derive(Parser)]
#[command(name = "td_headless")]
#[command(about = "Headless tower-defense runner for CI and external controllers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario to the end and print a JSON report
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "classic")]
        scenario: String,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Render flow fields as ASCII arrows
    Paths {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "classic")]
        scenario: String,

        /// Movement class to render (all when omitted)
        #[arg(short, long, value_enum)]
        class: Option<ClassArg>,

        /// Ticks to run before rendering
        #[arg(short, long, default_value = "0")]
        ticks: u64,

        /// Print a legend
        #[arg(long)]
        legend: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Verify determinism by running a scenario several times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "classic")]
        scenario: String,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: usize,
    },

    /// Control a simulation with JSON lines on stdin/stdout
    Serve {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "classic")]
        scenario: String,
    },
}

/// Movement class as a CLI value.
#[derive(Clone, Copy, ValueEnum)]
enum ClassArg {
    Unconstrained,
    Ground,
    Air,
}

impl From<ClassArg> for MovementClass {
    fn from(arg: ClassArg) -> Self {
        match arg {
            ClassArg::Unconstrained => Self::Unconstrained,
            ClassArg::Ground => Self::Ground,
            ClassArg::Air => Self::Air,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr (stdout is for reports and protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            output,
            pretty,
        }) => cmd_run(&scenario, output, pretty),
        Some(Commands::Paths {
            scenario,
            class,
            ticks,
            legend,
            no_color,
        }) => cmd_paths(&scenario, class.map(MovementClass::from), ticks, legend, !no_color),
        Some(Commands::Verify { scenario, runs }) => cmd_verify(&scenario, runs),
        Some(Commands::Serve { scenario }) => cmd_serve(&scenario),
        None => cmd_serve("classic"),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Run a scenario and emit its report.
fn cmd_run(scenario: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    tracing::info!(scenario = %scenario.name, ticks = scenario.total_ticks(), "Running scenario");

    let report = run_scenario(&scenario)?;
    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(io::Error::other)?;

    if let Some(path) = output {
        std::fs::write(&path, json)?;
        eprintln!("Report saved to: {}", path.display());
    } else {
        println!("{json}");
    }
    Ok(())
}

/// Render flow-field overlays, optionally after running some ticks.
fn cmd_paths(
    scenario: &str,
    class: Option<MovementClass>,
    ticks: u64,
    legend: bool,
    use_color: bool,
) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    let mut runner = ScenarioRunner::new(&scenario)?;
    for _ in 0..ticks {
        runner.step()?;
    }

    let config = AsciiConfig {
        show_units: true,
        show_legend: legend,
        use_color,
    };
    let text = match class {
        Some(class) => render_paths(runner.simulation(), class, &config),
        None => render_all(runner.simulation(), &config),
    };
    print!("{text}");
    Ok(())
}

/// Run a scenario repeatedly and compare final hashes.
fn cmd_verify(scenario: &str, runs: usize) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    let report = verify_scenario(&scenario, runs)?;

    println!("Scenario: {}", report.scenario);
    println!("Runs: {}", report.hashes.len());
    for (i, hash) in report.hashes.iter().enumerate() {
        println!("  run {i}: {hash:016x}");
    }

    if report.is_deterministic {
        println!("PASS: all runs produced identical state");
        Ok(())
    } else {
        println!("FAIL: runs diverged");
        std::process::exit(2);
    }
}

/// Serve the JSON-lines protocol on stdin/stdout.
fn cmd_serve(scenario: &str) -> Result<(), ScenarioError> {
    let scenario = Scenario::resolve(scenario)?;
    tracing::info!(scenario = %scenario.name, "Starting interactive session");

    let mut session = Session::new(scenario.build()?, scenario.tick_ms);
    let stdin = io::stdin();
    session.serve(stdin.lock(), io::stdout().lock())?;
    Ok(())
}
