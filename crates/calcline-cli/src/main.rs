//! Calcline CLI - evaluate expressions and calculator documents

use anyhow::{bail, Context, Result};
use calcline::prelude::*;
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "calcline")]
#[command(
    author,
    version,
    about = "Semantic calculator for units, currencies and dates"
)]
struct Cli {
    #[command(flatten)]
    options: EngineArgs,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct EngineArgs {
    /// JSON file with cached exchange rates
    #[arg(long, global = true, value_name = "FILE")]
    rates: Option<PathBuf>,

    /// Divide currencies into plain numbers instead of keeping leftover units
    #[arg(long, global = true)]
    no_cancellation: bool,

    /// Report references to undefined variables as errors
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single expression
    Eval {
        /// Expression, e.g. "2km + 300m to m"
        expression: String,
    },

    /// Calculate a document and print one result per line
    Run {
        /// Document file ("-" for stdin)
        input: PathBuf,

        /// Print each line next to its result
        #[arg(short, long)]
        annotate: bool,

        /// Print pass statistics to stderr
        #[arg(short, long)]
        stats: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = engine_options(&cli.options)?;
    match cli.command {
        Commands::Eval { expression } => eval(&expression, options),
        Commands::Run {
            input,
            annotate,
            stats,
        } => run(&input, options, annotate, stats),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn engine_options(args: &EngineArgs) -> Result<EngineOptions> {
    let fx_snapshot = args.rates.as_deref().map(load_rates).transpose()?;
    Ok(EngineOptions {
        arithmetic: ArithmeticOptions {
            dimensional_cancellation: !args.no_cancellation,
        },
        resolve_mode: if args.strict {
            ResolveMode::Strict
        } else {
            ResolveMode::AllowUnknownVariables
        },
        fx_snapshot,
        ..Default::default()
    })
}

fn load_rates(path: &Path) -> Result<FxRatesSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let snapshot: FxRatesSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse exchange rates in '{}'", path.display()))?;
    tracing::debug!(
        base = %snapshot.base,
        rates = snapshot.rates.len(),
        "loaded exchange rates"
    );
    Ok(snapshot)
}

fn eval(expression: &str, options: EngineOptions) -> Result<()> {
    let format = options.format;
    let engine = Engine::new(options);
    match engine.evaluate_line(expression) {
        SemanticValue::Error(e) => bail!("{e}"),
        value => println!("{}", value.display_with(&format)),
    }
    Ok(())
}

fn run(input: &Path, options: EngineOptions, annotate: bool, stats: bool) -> Result<()> {
    let document = if input == Path::new("-") {
        io::read_to_string(io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read '{}'", input.display()))?
    };

    let mut engine = Engine::new(options);
    let snapshot = engine.run(&document);

    let width = snapshot
        .lines
        .iter()
        .map(|line| line.text.trim_end().chars().count())
        .max()
        .unwrap_or(0);

    let mut out = io::stdout().lock();
    for line in &snapshot.lines {
        let display = line.display.as_deref().unwrap_or("");
        let text = line.text.trim_end();
        let written = match (annotate, display.is_empty()) {
            (true, true) => writeln!(out, "{text}"),
            (true, false) => writeln!(out, "{text:<width$}  = {display}"),
            (false, _) => writeln!(out, "{display}"),
        };
        written.context("Failed to write to stdout")?;
    }

    if stats {
        let stats = &snapshot.stats;
        eprintln!(
            "{} lines, {} variables ({} circular), {} errors, {} unresolved",
            stats.line_count,
            stats.variables_calculated,
            stats.circular_references,
            stats.errors,
            stats.symbolic
        );
    }

    Ok(())
}
