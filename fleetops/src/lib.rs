//! Fleet and transport operations service.
//!
//! Vehicles, drivers, jobs with driver bidding, inspections, licenses, schedules,
//! notifications and per-organization settings, served as a tenant-scoped JSON API on
//! top of [`fleetcrud`]. The [`screen`] and [`presentation`] modules hold the view-state
//! a client drives against that API.

pub mod access;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod entities;
pub mod error;
pub mod logging;
pub mod migration;
pub mod presentation;
pub mod screen;
pub mod settings;
pub mod state;

use sea_orm::{ConnectionTrait, Database};
use sea_orm_migration::MigratorTrait;

pub use api::build_router;
pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;

/// Connect, migrate, bootstrap, then serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if any startup step fails or the server stops with an I/O error.
pub async fn run(config: Config) -> Result<()> {
    let db = Database::connect(&config.database.url).await?;
    tracing::info!(backend = ?db.get_database_backend(), "Connected to database");

    if config.database.run_migrations {
        migration::Migrator::up(&db, None)
            .await
            .map_err(|err| Error::Migration(err.to_string()))?;
        tracing::info!("Migrations applied");
    }

    bootstrap::bootstrap(&db, &config.bootstrap).await?;

    let address = config.server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|source| Error::Bind {
            address: address.clone(),
            source,
        })?;

    let app = build_router(AppState::new(db, config));
    tracing::info!(%address, "Listening; API at {}, docs at {}", api::API_PREFIX, api::DOCS_PATH);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
