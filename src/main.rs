use std::sync::Arc;
use std::time::Duration;

use bytesize::ByteSize;
use log::{error, info};
use system_stats_lib::{
    LogFacadeLogger, StatsProvider, SystemStats, SystemStatsConfig, SystemStatsProvider,
};
use tokio::time;

const REPORT_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match SystemStatsConfig::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Sampling CPU over {:?}s windows, OS drive {}, data drive {}",
        config.cpu_windows(),
        config.os_drive(),
        config.data_drive()
    );

    let provider = match SystemStatsProvider::from_config(&config, Arc::new(LogFacadeLogger)) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to start samplers: {}", e);
            std::process::exit(1);
        }
    };

    let mut interval = time::interval(REPORT_PERIOD);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping samplers");
                break;
            }
            _ = interval.tick() => {
                report(&provider.fetch_snapshot());
            }
        }
    }

    // stopping joins the sampler threads
    if let Err(e) = tokio::task::spawn_blocking(move || provider.shutdown()).await {
        error!("Sampler shutdown task failed: {}", e);
    }
}

fn report(stats: &SystemStats) {
    if stats.cpu_last_updated.is_none() && stats.disk_last_updated.is_none() {
        info!("Waiting for first samples...");
        return;
    }

    info!(
        "CPU {:.1}% / {:.1}% / {:.1}% | OS drive {} free ({:.1}%) | data drive {} free ({:.1}%)",
        stats.short_term_cpu_usage,
        stats.medium_term_cpu_usage,
        stats.long_term_cpu_usage,
        ByteSize::b(stats.os_drive_free_bytes),
        stats.os_drive_free_percentage,
        ByteSize::b(stats.data_drive_free_bytes),
        stats.data_drive_free_percentage,
    );

    match serde_json::to_string(stats) {
        Ok(json) => log::debug!("snapshot {}", json),
        Err(e) => error!("Failed to serialise snapshot: {}", e),
    }
}
