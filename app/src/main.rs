use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use common::result::{PayloadShape, concurrency_from_path, discover_results, load_results};
use eyre::Result;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod report;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    log: Vec<String>,
}

/// Result file format version; fixes both the payload contract and the
/// filename -> concurrency rule.
#[derive(Debug, Default, Clone, Copy, ValueEnum)]
enum Format {
    #[default]
    Flat,
    Nested,
}

impl From<Format> for PayloadShape {
    fn from(format: Format) -> Self {
        match format {
            Format::Flat => PayloadShape::Flat,
            Format::Nested => PayloadShape::Nested,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List result files and their concurrency levels
    Ls {
        #[arg(short, long, default_value = "benchmark-results")]
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },
    /// Render the four metric bar charts
    Report {
        #[arg(short, long, default_value = "benchmark-results")]
        input: PathBuf,
        /// Folder the charts are written to, created if missing
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
        /// Scale the y-axis to the data instead of leaving label headroom
        #[arg(long, default_value_t = false)]
        no_headroom: bool,
    },
    /// Print the aggregated metric table
    Print {
        #[arg(short, long, default_value = "benchmark-results")]
        input: PathBuf,
        #[arg(short, long, value_enum, default_value_t)]
        format: Format,
    },
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();
    let file_appender = tracing_appender::rolling::never(".", "log.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let mut env_filter = EnvFilter::new(format!("bench_report={log_level}"));

    if !args.log.is_empty() {
        for log in &args.log {
            env_filter = env_filter.add_directive(log.parse()?);
        }
    }

    for module in ["common", "charts"] {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(layer().with_writer(non_blocking))
        .init();

    match args.command {
        Commands::Ls { input, format } => list_results(&input, format.into())?,
        Commands::Report {
            input,
            output,
            format,
            no_headroom,
        } => {
            if let Err(err) =
                report::run_report(&input, output.as_deref(), format.into(), !no_headroom)
            {
                error!("{err:#?}");
                return Err(err);
            }
        }
        Commands::Print { input, format } => print_table(&input, format.into())?,
    };

    Ok(())
}

fn list_results(input: &Path, shape: PayloadShape) -> Result<()> {
    for path in discover_results(input)? {
        println!(
            "{} -> {}",
            path.file_name().unwrap_or_default().to_string_lossy(),
            concurrency_from_path(&path, shape)?
        );
    }
    Ok(())
}

fn print_table(input: &Path, shape: PayloadShape) -> Result<()> {
    let table = load_results(input, shape)?;
    println!(
        "{:>12} {:>14} {:>12} {:>12} {:>12}",
        "concurrency", "throughput", "ttft_ms", "itl_ms", "e2e_ms"
    );
    for record in table.records() {
        println!(
            "{:>12} {:>14.2} {:>12.2} {:>12.2} {:>12.2}",
            record.concurrency, record.throughput, record.ttft_ms, record.itl_ms, record.e2e_ms
        );
    }
    Ok(())
}
