/**
 * Server Initialization
 *
 * Builds the application: configuration, database pool, collaborator
 * implementations, and the router.
 *
 * # Initialization Steps
 *
 * 1. Load configuration from the environment
 * 2. Connect the PostgreSQL pool and run migrations
 * 3. Construct the identity and document collaborators
 * 4. Assemble `AppState` and the router
 *
 * All dependencies are constructed here and injected; handlers never
 * build their own services.
 */
use std::sync::Arc;

use axum::Router;

use crate::backend::identity::{JwtIdentityProvider, PgDocumentDirectory};
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{connect_database, ServerConfig};
use crate::backend::server::state::AppState;

/// Create and configure the Axum application
///
/// # Errors
///
/// Returns an error string when configuration is incomplete or the
/// database cannot be reached.
pub async fn create_app() -> Result<(Router, ServerConfig), String> {
    tracing::info!("Initializing StudyCollab backend server");

    let config = ServerConfig::from_env()?;

    let pool = connect_database(&config.database_url)
        .await
        .map_err(|e| format!("Failed to initialize database: {e}"))?;

    let identity = Arc::new(JwtIdentityProvider::new(
        pool.clone(),
        config.jwt_secret.clone(),
    ));
    let documents = Arc::new(PgDocumentDirectory::new(pool.clone()));

    let state = AppState::new(pool, identity, documents);
    let app = create_router(state);

    tracing::info!("Application state and routes initialized");
    Ok((app, config))
}
