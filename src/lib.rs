//! Cafe POS client.
//!
//! Menu browsing, cart and checkout for staff; sales dashboards, staff
//! rankings and menu management for admins. All data lives behind a remote
//! HTTP API; locally we keep only the session preferences.

use anyhow::Context;
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod api;
pub mod console;
pub mod dashboard;
mod db;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod notify;
pub mod render;
pub mod settings;
pub mod store;
pub mod sync;

#[cfg(test)]
mod test_support;

use crate::api::HttpGateway;
use crate::console::{Console, ConsoleView};
use crate::dashboard::Tab;
use crate::settings::{EnvOverrides, Preferences};
use crate::sync::ViewSynchronizer;

pub fn run() -> anyhow::Result<()> {
    // Initialize structured logging (stderr + rolling file). Stdout belongs
    // to the console.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cafe_pos_client_lib=debug"));

    // Prune old log files before setting up the appender
    diagnostics::prune_old_logs();

    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "pos");
    // Dropping the guard flushes buffered log lines; it lives until run returns.
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Starting Cafe POS v{}", env!("CARGO_PKG_VERSION"));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    runtime.block_on(start())
}

async fn start() -> anyhow::Result<()> {
    let data_dir = diagnostics::get_data_dir();
    let db = match db::init(&data_dir) {
        Ok(db) => db,
        Err(e) => {
            warn!(data_dir = %data_dir.display(), error = %e, "settings database unavailable, preferences will not persist");
            db::init_in_memory().map_err(anyhow::Error::msg)?
        }
    };
    let db = Arc::new(db);
    info!(path = %db.db_path.display(), "settings database ready");

    let prefs = Preferences::load(&db, &EnvOverrides::from_env())?;
    let gateway = Arc::new(HttpGateway::new(&prefs.api_base_url)?);
    let sync = ViewSynchronizer::new(
        gateway,
        Arc::new(ConsoleView),
        prefs.role,
        Local::now().date_naive(),
    );

    info!(role = %prefs.role, api = %prefs.api_base_url, "session started");

    // The menu loads on start for every role; admins also land on today's stats.
    sync.refresh_menu();
    sync.navigate_to(Tab::initial_for(prefs.role))?;

    Console::new(sync, db).with_theme(prefs.theme).run().await?;
    info!("Cafe POS stopped");
    Ok(())
}
