use std::sync::Arc;

use tracing::{error, info, warn};

use outpost::pipeline::SendPipeline;
use outpost::rate_limit::{spawn_sweeper, RateLimitConfig, RateLimiter};
use outpost::session::SessionManager;
use outpost::{Config, Database};

#[tokio::main]
async fn main() {
    // Load configuration (config.toml + environment overrides)
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = outpost::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        outpost::logging::init_console_only(&config.logging.level);
    }

    info!("Outpost - webmail send pipeline");

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    let database = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {e}", config.database.path);
            std::process::exit(1);
        }
    };
    if let Err(e) = database.migrate().await {
        error!("Failed to run migrations: {e}");
        std::process::exit(1);
    }

    let transport = match outpost::build_transport(&config.smtp) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to build mail transport: {e}");
            std::process::exit(1);
        }
    };
    if transport.verify().await {
        info!("Mail transport verified");
    } else {
        warn!("Mail transport verification failed; sends may not be deliverable");
    }

    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(
        config.rate_limit.max_per_window,
        config.rate_limit.window_secs,
    )));
    let sweeper = spawn_sweeper(limiter.clone());

    let sessions = Arc::new(SessionManager::new());
    let _pipeline = SendPipeline::new(
        sessions.clone(),
        limiter.clone(),
        transport,
        database.pool().clone(),
    );

    info!(
        "Send pipeline ready ({} sends per {}s window)",
        config.rate_limit.max_per_window, config.rate_limit.window_secs
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {e}"),
    }

    sweeper.shutdown().await;
    info!("Outpost stopped");
}
