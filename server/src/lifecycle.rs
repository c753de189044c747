use std::net::SocketAddr;

use actix_web::{dev::ServerHandle, HttpServer};
use chrono::{DateTime, Local, TimeZone, Timelike};
use tokio::task::JoinHandle;

use crate::app::{build_app, AppState};
use crate::config::AppConfig;
use crate::db::MongoDbContext;
use crate::error::{AppError, Result};
use crate::middleware::CorsPolicy;
use crate::session::SessionLayer;

/// Operator-facing start banner, e.g. `9:05 - server is listening on 8080`.
pub fn listening_message<Tz: TimeZone>(now: &DateTime<Tz>, port: u16) -> String {
    format!(
        "{}:{:02} - server is listening on {}",
        now.hour(),
        now.minute(),
        port
    )
}

/// A started server: owns the listener and the database connection.
///
/// Dropping it without calling [`RunningServer::stop`] leaves both running
/// until the runtime shuts down.
pub struct RunningServer {
    db: MongoDbContext,
    handle: ServerHandle,
    task: JoinHandle<std::io::Result<()>>,
    addrs: Vec<SocketAddr>,
}

/// Connects the database, then binds and spawns the HTTP listener.
///
/// Must be called from within an actix system (`#[actix_web::main]` or
/// `#[actix_web::test]`).
pub async fn start(
    config: &AppConfig,
    database_url: &str,
    sessions: SessionLayer,
) -> Result<RunningServer> {
    log::info!("Connecting to MongoDB...");
    let db = MongoDbContext::connect(database_url, config.database_name.as_deref()).await?;

    start_with_database(config, db, sessions).await
}

/// Serves an already connected database. On any failure `db` is
/// disconnected before the error is returned.
pub async fn start_with_database(
    config: &AppConfig,
    db: MongoDbContext,
    sessions: SessionLayer,
) -> Result<RunningServer> {
    let cors = match CorsPolicy::new(&config.cors_allowed_origins) {
        Ok(cors) => cors,
        Err(err) => {
            db.disconnect().await;
            return Err(err);
        }
    };

    if let Err(err) = db.init_indexes().await {
        db.disconnect().await;
        return Err(err);
    }

    let state = AppState::new(db.clone(), sessions, cors);
    let bound = HttpServer::new(move || build_app(state.clone()))
        .bind((config.host.as_str(), config.port));

    let server = match bound {
        Ok(server) => server,
        Err(source) => {
            db.disconnect().await;
            return Err(AppError::Bind {
                addr: format!("{}:{}", config.host, config.port),
                source,
            });
        }
    };

    let addrs = server.addrs();
    let server = server.disable_signals().run();
    let handle = server.handle();
    let task = actix_rt::spawn(server);

    let running = RunningServer {
        db,
        handle,
        task,
        addrs,
    };
    log::info!("{}", listening_message(&Local::now(), running.port()));

    Ok(running)
}

impl RunningServer {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addrs.first().copied()
    }

    /// The bound port; differs from the configured one when that was `0`.
    pub fn port(&self) -> u16 {
        self.local_addr().map(|addr| addr.port()).unwrap_or_default()
    }

    /// Disconnects the database, then gracefully stops the listener.
    pub async fn stop(self) -> Result<()> {
        self.db.disconnect().await;
        log::info!("server is down");

        self.handle.stop(true).await;

        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(AppError::Shutdown(err.to_string())),
            Err(err) => Err(AppError::Shutdown(format!("server task failed: {}", err))),
        }
    }
}
