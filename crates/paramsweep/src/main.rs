use clap::Parser;
use paramsweep::{RunConfig, RunReport, init_logging, summarize};
use paramsweep_core::ExecutionMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paramsweep")]
#[command(about = "Sweep a model over one to three parameter axes")]
struct Args {
    /// Path to the run configuration (YAML)
    config: PathBuf,

    /// Path to the data directory (default: ~/.paramsweep/)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run in parallel with this many workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Report progress while sweeping
    #[arg(short, long)]
    progress: bool,

    /// Write shape, threshold and results to this YAML file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".paramsweep")
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let data_dir = args.data_dir.unwrap_or_else(default_data_dir);

    init_logging(&data_dir, &args.log_level)?;

    let mut config = RunConfig::load(&args.config)?;
    config.resolve_cache_prefix(&data_dir);
    if let Some(workers) = args.workers {
        config.sweep.execution_mode = ExecutionMode::Parallel;
        config.sweep.num_workers = Some(workers);
    }
    if args.progress {
        config.sweep.show_progress = true;
    }

    let spec = config.spec()?;
    tracing::info!(
        model = config.model.name(),
        kind = %spec.kind(),
        "Starting sweep"
    );

    let results = paramsweep_core::run(&spec, &config.model, &config.system)?;
    let report = RunReport::new(&spec, &results);
    println!("{}", summarize(&spec, &report));

    if let Some(output) = &args.output {
        report.write_yaml(output)?;
        tracing::info!("Results written to {}", output.display());
    }

    tracing::info!("Run finished");
    Ok(())
}
