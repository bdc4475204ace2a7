/**
 * Authentication Middleware
 *
 * Protects routes that require a resolved user identity. The middleware:
 *
 * 1. Extracts the bearer token from the Authorization header
 * 2. Resolves it through the injected `IdentityProvider`
 * 3. Attaches an `AuthenticatedUser` to request extensions
 *
 * Missing or invalid credentials surface as 401; locked accounts as 423.
 * Authorization beyond identity (roles, membership) is the handlers'
 * concern.
 */
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::backend::error::ApiError;
use crate::backend::server::state::AppState;

/// Authenticated user attached to request extensions
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Bearer-token authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Authorization header");
            ApiError::Unauthenticated
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("Invalid Authorization header format");
        ApiError::Unauthenticated
    })?;

    let identity = state.identity.resolve(token).await?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: identity.user_id,
    });

    Ok(next.run(request).await)
}
