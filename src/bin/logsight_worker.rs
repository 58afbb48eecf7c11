use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use logsight::config::Config;
use logsight::persistence::{SqliteStatusStore, StatusStore};
use logsight::pipeline::run_pending;

/// Worker that drains pending log files from the status store
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    log::info!("Starting logsight worker...");

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, finishing current jobs...");
        r.store(false, Ordering::SeqCst);
    })?;

    let store: Arc<dyn StatusStore> = Arc::new(SqliteStatusStore::new(&config.storage.database_path)?);
    log::info!(
        "Using database {:?}, up to {} concurrent job(s)",
        config.storage.database_path,
        config.storage.worker_concurrency
    );

    let poll_interval = Duration::from_millis(config.storage.poll_interval_ms);
    let config = Arc::new(config);
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        while running.load(Ordering::SeqCst) {
            match run_pending(Arc::clone(&store), Arc::clone(&config)).await {
                Ok(0) => tokio::time::sleep(poll_interval).await,
                Ok(n) => log::info!("Finished {} job(s)", n),
                Err(e) => {
                    log::error!("Failed to poll pending files: {}", e);
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    });

    log::info!("logsight worker stopped");
    Ok(())
}
