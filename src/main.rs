use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;

use air_quality_dashboard::catalog::StationCatalog;
use air_quality_dashboard::config::DashboardConfig;
use air_quality_dashboard::error::StationError;
use air_quality_dashboard::report;
use air_quality_dashboard::state::DashboardState;

/// Load station air-quality files and report on one station over a date range.
#[derive(Parser, Debug)]
#[command(name = "air-quality-dashboard", version, about)]
struct Args {
    /// JSON station manifest; defaults to the five PRSA stations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the PRSA files when no manifest is given
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Station to show (first configured station if omitted)
    #[arg(long)]
    station: Option<String>,

    /// First day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Number of rows to preview
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::prsa_default(args.data_dir.clone()),
    };

    let catalog = StationCatalog::load(&config.sources());
    log::info!(
        "{} of {} stations available",
        catalog.available().count(),
        catalog.len()
    );

    let mut state = DashboardState::new(catalog);
    if let Some(id) = &args.station {
        state.select_station(id);
    }
    // An empty station has no bounds; a single given day stands in for both ends.
    let fallback = args.start.or(args.end).map(|d| (d, d));
    if let Some((lo, hi)) = state.date_range.or(fallback) {
        if args.start.is_some() || args.end.is_some() {
            state.set_date_range(args.start.unwrap_or(lo), args.end.unwrap_or(hi));
        }
    }

    print!("{}", report::render(&state, args.preview, args.json)?);

    if let Some(id) = &args.station {
        if let Err(e @ StationError::UnknownStation(_)) = state.catalog.dataset(id) {
            anyhow::bail!(e);
        }
    }
    Ok(())
}
