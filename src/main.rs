use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rove::config::NavConfig;
use rove::format::format_distance;
use rove::nav_tracker::{LogGuidanceSink, NavTracker};
use rove::replay::{FileFixSource, FixSource};
use rove::route::Route;

#[derive(Parser)]
#[command(name = "rove", version, about = "Turn-by-turn navigation tracking engine")]
struct Cli {
    /// TOML config file overriding the default tuning
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded fix stream through a route and log guidance updates
    Replay {
        /// Route JSON file (object with a steps array, or a bare step array)
        #[arg(long)]
        route: PathBuf,

        /// JSON-lines file with one position fix per line
        #[arg(long)]
        fixes: PathBuf,

        /// Print accumulated metrics in Prometheus format when the replay ends
        #[arg(long)]
        dump_metrics: bool,
    },
    /// Print the normalized steps of a route with leg distances
    Route {
        /// Route JSON file
        #[arg(long)]
        route: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NavConfig::load(path)?,
        None => NavConfig::default(),
    };

    match cli.command {
        Command::Replay {
            route,
            fixes,
            dump_metrics,
        } => replay(config, &route, &fixes, dump_metrics).await,
        Command::Route { route } => print_route(&route),
    }
}

async fn replay(
    config: NavConfig,
    route_path: &Path,
    fixes_path: &Path,
    dump_metrics: bool,
) -> Result<()> {
    let _ = rove::metrics::init_metrics();

    let route = Route::load(route_path)?;
    let mut tracker = NavTracker::new(config);
    tracker.add_sink(Arc::new(LogGuidanceSink));

    tracker.start_stale_session_reaper(60);

    let session_id = tracker.start_session(route)?;
    let mut source = FileFixSource::open(fixes_path).await?;

    let mut accepted: usize = 0;
    while let Some(fix) = source.next_fix().await? {
        if let Some(update) = tracker.process_fix(session_id, fix).await {
            accepted += 1;
            if update.arrived {
                info!("destination reached; stopping replay");
                break;
            }
        }
    }

    info!(
        fixes_read = source.fixes_read(),
        accepted, "replay complete"
    );
    tracker.end_session(session_id);

    if dump_metrics {
        if let Some(text) = rove::metrics::render_metrics() {
            println!("{text}");
        }
    }
    Ok(())
}

fn print_route(path: &Path) -> Result<()> {
    let route = Route::load(path)?;

    if let Some(name) = &route.name {
        println!("{name}");
    }
    for (index, step) in route.steps.iter().enumerate() {
        let leg = if index == 0 {
            "      ".to_string()
        } else {
            format!("{:>6}", format_distance(route.leg_distance_m(index - 1)))
        };
        println!(
            "{:>3}. {}  {}  ({:.6}, {:.6})",
            index + 1,
            leg,
            step.instruction,
            step.latitude,
            step.longitude
        );
    }

    let total = route
        .total_distance_m
        .unwrap_or_else(|| route.summed_leg_distance_m());
    println!("total: {}", format_distance(total));
    Ok(())
}
