// Busy and lazy code motion over a flow graph description.

use clap::Parser;
use derive_more::Display;
use std::str::FromStr;

use code_motion::front_end::parse_graph;
use code_motion::middle_end::analysis::{NoObserver, Seeding, TracingObserver, UpdateObserver};
use code_motion::middle_end::code_motion::{dump_dot, CodeMotion, Report, SolverOptions};

#[derive(Clone, Copy, Debug, Display)]
enum Format {
    #[display(fmt = "text")]
    Text,
    #[display(fmt = "json")]
    Json,
    #[display(fmt = "dot")]
    Dot,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "dot" => Ok(Format::Dot),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

// Command-line arguments
#[derive(Parser)]
#[command(version, about)]
struct Args {
    input_file: String,
    /// Where to write the result; standard output when missing.
    #[arg(short, long)]
    output_file: Option<String>,
    #[arg(long, default_value_t = Format::Text)]
    format: Format,
    /// Overrides the seeding read from `--config`.
    #[arg(long)]
    seeding: Option<Seeding>,
    /// JSON file with solver options.
    #[arg(long)]
    config: Option<String>,
    /// Emit every value flip as a trace event (needs `RUST_LOG=trace`).
    #[arg(long)]
    trace_updates: bool,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn read(path: &str) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Could not read {path}: {e}"))
}

fn run(args: &Args) -> Result<String, String> {
    let mut options = match &args.config {
        Some(path) => SolverOptions::from_json(&read(path)?)
            .map_err(|e| format!("Invalid configuration in {path}: {e}"))?,
        None => SolverOptions::default(),
    };
    if let Some(seeding) = args.seeding {
        options.seeding = seeding;
    }

    let graph = parse_graph(&read(&args.input_file)?)
        .map_err(|e| format!("Could not parse {}: {e}", args.input_file))?;
    tracing::info!(
        real_nodes = graph.real_count(),
        seeding = %options.seeding,
        "loaded flow graph"
    );

    let mut observer: Box<dyn UpdateObserver> = if args.trace_updates {
        Box::new(TracingObserver)
    } else {
        Box::new(NoObserver)
    };

    let mut session = CodeMotion::with_options(&graph, options);
    let placement = session
        .run_all(observer.as_mut())
        .map_err(|e| e.to_string())?;

    let output = match args.format {
        Format::Text => Report::new(&session).map_err(|e| e.to_string())?.to_string(),
        Format::Json => Report::new(&session)
            .map_err(|e| e.to_string())?
            .to_json()
            .map_err(|e| e.to_string())?,
        Format::Dot => dump_dot(&graph, Some(&placement)),
    };
    Ok(output)
}

pub fn main() {
    init_tracing();
    let args = Args::parse();

    let output = run(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        std::process::exit(1)
    });

    match &args.output_file {
        Some(output_file) => std::fs::write(output_file, output).unwrap_or_else(|_| {
            eprintln!("Failed to write the result to the output file: {output_file}");
            std::process::exit(1)
        }),
        None => print!("{output}"),
    }
}
