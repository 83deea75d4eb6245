//! Prints the lineups of the configured account and what is airing now
//!
//! ```bash
//! PMOGUIDE_CONFIG__GUIDE__TOKEN=<session token> cargo run --example guide_summary
//! ```

use chrono::Utc;
use pmoconfig::get_config;
use pmoguide::GuideConfigExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = get_config();
    if config.get_log_enable_console()? {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(config.get_log_min_level()?.to_lowercase()))
            .init();
    }

    let transport = config.guide_http_transport()?;
    let orchestrator = config.guide_orchestrator(transport)?;

    let status = orchestrator.user_status()?;
    info!(
        expires = %status.account.expires,
        last_update = %status.last_data_update,
        "Account status"
    );
    if let Some(system) = &status.system_status {
        info!(status = %system.status, "{}", system.details);
    }

    let lineups = orchestrator.lineups()?;
    if lineups.is_empty() {
        warn!("No lineup registered on this account");
        return Ok(());
    }

    let now = Utc::now();
    for lineup in lineups.entities.values() {
        let lineup = orchestrator.load_lineup_details(lineup)?;
        let airings = orchestrator.fetch_airings(&lineup)?;
        println!("{} ({})", lineup.name, lineup.location);

        let channels = lineup.logical_channel_map()?;
        for (station_id, schedule) in &airings.entities {
            let Some(current) = schedule.iter().find(|a| a.is_airing_at(now)) else {
                continue;
            };
            let channel = channels
                .get(station_id)
                .and_then(|numbers| numbers.first())
                .map(String::as_str)
                .unwrap_or("?");
            println!(
                "  {:>6} {:<10} {}",
                channel,
                current.station().callsign,
                current.program().title
            );
        }
        for failure in &airings.failures {
            warn!("Unresolved: {}", failure);
        }
    }

    let stats = orchestrator.cache().stats();
    info!(
        programs = stats.programs_count,
        stations = stats.stations_count,
        schedules = stats.schedules_count,
        "Cache content"
    );
    Ok(())
}
