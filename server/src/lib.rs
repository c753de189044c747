// Library exports for testing and reuse

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod monitor;
pub mod session;

pub use app::{build_app, AppState};
pub use lifecycle::{start, start_with_database, RunningServer};
