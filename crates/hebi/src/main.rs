use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use hebi::{App, AppConfig, RunOptions};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run without a tracking session (the snake wanders)
    #[arg(long)]
    offline: bool,

    /// Directory of still images to stream instead of the synthetic pattern
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Stop after this many ticks (default: run until Ctrl-C)
    #[arg(long)]
    ticks: Option<u64>,

    /// Seed for food placement and wandering (default: random)
    #[arg(long)]
    seed: Option<u64>,

    /// Game ticks per second
    #[arg(long, default_value = "60")]
    tick_rate: f32,

    /// Log a status line every N ticks (0 to disable)
    #[arg(long, default_value = "300")]
    report_every: u64,

    /// Configuration file (default: hebi.ron if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = AppConfig::load_from(args.config.as_deref())?;

    let default_filter = if config.debug.verbose_logging {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.print_config {
        println!("{}", config.to_ron()?);
        return Ok(());
    }

    if !(args.tick_rate.is_finite() && args.tick_rate > 0.0) {
        anyhow::bail!("--tick-rate must be positive, got {}", args.tick_rate);
    }

    let options = RunOptions {
        offline: args.offline,
        frames_dir: args.frames_dir,
        ticks: args.ticks,
        seed: args.seed.unwrap_or_else(rand::random),
        tick_rate: args.tick_rate,
        report_every: args.report_every,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let app = App::new(config, options)?;
    let summary = runtime.block_on(app.run(shutdown_signal()))?;

    println!(
        "score {} | length {} | {} ticks ({} tracked, {} tracking losses)",
        summary.score, summary.length, summary.ticks, summary.tracked_ticks, summary.tracking_losses
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }
}
