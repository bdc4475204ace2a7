/**
 * Application State
 *
 * `AppState` is the single dependency container handed to every handler.
 * It is constructed once in `server::init` and cloned per request; all
 * fields are cheaply cloneable handles.
 *
 * # Dependency Injection
 *
 * The identity and document collaborators are trait objects injected at
 * construction time. Nothing in the backend reaches for globals or
 * lazily-built singletons; tests swap in fixed collaborators.
 */
use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::identity::{DocumentDirectory, IdentityProvider};

/// Central application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub db: PgPool,
    /// Resolves bearer credentials to user identities
    pub identity: Arc<dyn IdentityProvider>,
    /// Resolves document ids for share authorization
    pub documents: Arc<dyn DocumentDirectory>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentDirectory>,
    ) -> Self {
        Self {
            db,
            identity,
            documents,
        }
    }
}
