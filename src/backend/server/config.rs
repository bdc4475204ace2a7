/**
 * Server Configuration
 *
 * Loads server configuration from environment variables and establishes
 * the PostgreSQL connection pool.
 *
 * # Configuration Sources
 *
 * - `DATABASE_URL` - PostgreSQL connection string (required)
 * - `JWT_SECRET` - HS256 secret for bearer-token verification
 * - `SERVER_PORT` - listen port, default 3000
 *
 * Unlike optional services, the database is a hard requirement: every
 * operation in this core reads or writes the relational store, so
 * startup fails fast when the pool cannot be created.
 */
use sqlx::PgPool;

/// Server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error message if `DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL is required".to_string())?;

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using development default");
            "dev-secret-change-in-production".to_string()
        });

        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        Ok(Self {
            database_url,
            jwt_secret,
            port,
        })
    }
}

/// Create the database connection pool and run migrations
///
/// # Errors
///
/// Returns the driver error if the pool cannot be created or a
/// migration fails.
pub async fn connect_database(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url).await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

    tracing::info!("Database ready");
    Ok(pool)
}
