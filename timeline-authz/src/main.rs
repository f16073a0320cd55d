use std::sync::Arc;

use service_core::error::AppError;
use service_core::observability::init_tracing;
use timeline_authz::{
    config::AuthzConfig,
    db,
    services::{AuthzStore, PgStore, PrincipalResolver},
    AuthzServices, OrganizationStatus,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthzConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.common.otlp_endpoint.as_deref(),
        config.common.log_json,
    )?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting timeline access-control core"
    );

    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

    let store = PgStore::new(pool);
    store.health_check().await?;
    tracing::info!("Database initialized successfully");

    // Key material must load before anything is served.
    let _resolver = PrincipalResolver::new(&config.jwt)?;
    tracing::info!("Token verification key loaded");

    let services = AuthzServices::new(Arc::new(store));

    let pending = services
        .store
        .list_organizations_by_status(OrganizationStatus::Pending)
        .await?;
    tracing::info!(pending = pending.len(), "Organizations awaiting review");

    tracing::info!("Startup checks complete");
    Ok(())
}
