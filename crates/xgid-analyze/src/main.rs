//! xgid-analyze - Batch analysis of backgammon positions.
//!
//! Reads XGIDs from the command line and from files, analyses them with
//! GNU Backgammon across a pool of engine processes, and writes a JSON
//! report. Logs go to stderr so the report can be piped.

mod input;
mod output;

use anyhow::Context;
use clap::Parser;
use gnubg_analysis::AnalysisConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the engine executable.
const ENGINE_PATH_ENV: &str = "GNUBG_PATH";

/// xgid-analyze - Analyses XGID positions with GNU Backgammon.
#[derive(Parser, Debug)]
#[command(name = "xgid-analyze")]
#[command(about = "Analyses backgammon positions with GNU Backgammon")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "analysis.toml")]
    config: PathBuf,

    /// Engine executable (overrides GNUBG_PATH and engine.path)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Concurrent engine processes (0 = CPUs minus two)
    #[arg(long)]
    workers: Option<usize>,

    /// Positions analysed by one engine process (0 = spread evenly over the workers)
    #[arg(long)]
    positions_per_engine: Option<usize>,

    /// Chequer-play lookahead
    #[arg(long)]
    plies: Option<u8>,

    /// Cube-decision lookahead
    #[arg(long)]
    cube_plies: Option<u8>,

    /// Evaluate chequer play cubeless
    #[arg(long)]
    cubeless: bool,

    /// Time bound per position in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Position to analyse (repeatable)
    #[arg(long = "xgid", value_name = "XGID")]
    xgids: Vec<String>,

    /// Files with one XGID per line
    files: Vec<PathBuf>,
}

impl Args {
    /// Layers command-line flags and the environment over file settings.
    fn apply(&self, mut config: AnalysisConfig, env_engine: Option<PathBuf>) -> anyhow::Result<AnalysisConfig> {
        if let Some(path) = self.engine.clone().or(env_engine) {
            config.engine.path = Some(path);
        }
        if let Some(workers) = self.workers {
            config.pool.workers = workers;
        }
        if let Some(positions) = self.positions_per_engine {
            config.pool.positions_per_engine = positions;
        }
        if let Some(plies) = self.plies {
            config.analysis.plies = plies;
        }
        if let Some(cube_plies) = self.cube_plies {
            config.analysis.cube_plies = cube_plies;
        }
        if self.cubeless {
            config.analysis.cubeful = false;
        }
        if let Some(timeout) = self.timeout {
            config.engine.timeout_secs = timeout;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = AnalysisConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let config = args.apply(config, std::env::var_os(ENGINE_PATH_ENV).map(PathBuf::from))?;

    let requests = input::collect_requests(&args.xgids, &args.files, config.analysis)?;
    if requests.is_empty() {
        anyhow::bail!("no positions given; pass --xgid or an input file");
    }

    let coordinator = config.coordinator(&config.locator())?;
    tracing::info!("Engine: {}", coordinator.engine().executable().display());

    let report = coordinator.analyze_all(requests).await?;
    output::write_report(args.output.as_deref(), &report).context("Failed to write report")?;

    if report.failed() > 0 {
        anyhow::bail!("{} of {} position(s) failed", report.failed(), report.len());
    }
    tracing::info!("All {} position(s) analysed", report.len());
    Ok(())
}
