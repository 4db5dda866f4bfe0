// Matchday entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Parse the update plan from command-line flags
// 4. Build the Fantrax league source
// 5. Run the update
// 6. Report what changed

mod fantrax;

use matchday_core::config;
use matchday_core::pipeline::{self, UpdatePlan};

use anyhow::Context;
use tracing::{error, info};

use crate::fantrax::FantraxSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Matchday starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={} ({}), current week {} of {}",
        config.league.name,
        config.league.league_id,
        config.league.current_week,
        config.league.season_weeks
    );

    // 3. Update plan
    let plan = UpdatePlan::from_args(std::env::args().skip(1))?;
    info!("Update plan: {:?}", plan);

    // 4. League source
    let source = FantraxSource::from_config(&config)?;
    if config.credentials.session_cookie.is_none() {
        info!("No session cookie configured; only public league data is reachable");
    }

    // 5. Run
    let summary = match pipeline::run(&config, &source, plan).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Update failed: {e:#}");
            return Err(e);
        }
    };

    // 6. Report
    println!(
        "Updated {}: {} matchups, rosters {} fetched / {} cached / {} failed, {} optimal scores",
        config.league.name,
        summary.matchups,
        summary.rosters.fetched,
        summary.rosters.cached,
        summary.rosters.failed,
        summary.optimal_scores
    );
    if !summary.failed_weeks.is_empty() {
        println!("Weeks that could not be fetched: {:?}", summary.failed_weeks);
    }
    if let Some(count) = summary.waivers {
        println!("Waiver pool: {count} players");
    }
    if summary.projected > 0 {
        println!("Projected {} matchups", summary.projected);
    }
    if let Some(lines) = summary.stat_lines {
        println!(
            "Stat detail: {lines} player-weeks written to {}",
            config.stats_detail_path().display()
        );
    }
    println!("State written to {}", config.state_path().display());

    info!("Matchday finished");
    Ok(())
}

/// Initialize tracing to log to `logs/matchday.log` under the working
/// directory. Stdout is kept for the run summary.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("matchday.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("matchday=info,matchday_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
