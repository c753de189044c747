use std::sync::Arc;

use anyhow::Context;

use peach_server::config::AppConfig;
use peach_server::monitor::StoreMonitor;
use peach_server::session::{MongoSessionStore, SessionLayer};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (for development)
    // Try loading from current directory first, then from server/ directory
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Hint: copy server/.env.example to server/.env and fill it in");
        std::process::exit(1);
    });
    log::debug!("Loaded configuration: {:?}", config);

    let monitor = StoreMonitor::new();
    let store = MongoSessionStore::connect(
        &config.database_url,
        config.database_name.as_deref(),
        &config.session_collection,
        monitor.clone(),
    )
    .await
    .context("failed to create the session store")?;
    let sessions = SessionLayer::new(Arc::new(store), &config, monitor)
        .context("failed to set up sessions")?;

    if !config.autostart {
        log::warn!("AUTOSTART is disabled; not starting the server");
        return Ok(());
    }

    // A failed start is logged, not fatal: the process stays up for inspection.
    let running = match peach_server::start(&config, &config.database_url, sessions).await {
        Ok(running) => Some(running),
        Err(err) => {
            log::error!("Failed to start server: {}", err);
            None
        }
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    if let Some(running) = running {
        running.stop().await.context("failed to stop the server")?;
    }

    Ok(())
}
