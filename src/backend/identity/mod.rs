/**
 * External Collaborator Contracts
 *
 * The core trusts two narrow collaborators:
 *
 * - `IdentityProvider` resolves a bearer credential to a user id,
 *   rejecting missing/invalid credentials and locked accounts
 * - `DocumentDirectory` resolves a document id to its owner and
 *   visibility, for the share-ownership check
 *
 * Both are injected into `AppState` at startup as trait objects, so
 * tests can substitute fixed implementations without a database.
 *
 * The production `IdentityProvider` verifies an HS256 JWT and checks
 * the account lock column in the `users` table. Token issuance lives
 * elsewhere; this side only verifies.
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::error::ApiError;

/// Identity resolved from a bearer credential
#[derive(Debug, Clone, Copy)]
pub struct ResolvedIdentity {
    pub user_id: Uuid,
}

/// Document metadata needed for share authorization
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub is_public: bool,
    pub filename: String,
}

/// Resolves bearer credentials to user identities
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token
    ///
    /// # Errors
    ///
    /// * `Unauthenticated` - token is missing, malformed, or expired
    /// * `AccountLocked` - the account exists but is temporarily locked
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ApiError>;
}

/// Looks up documents for the share-ownership check
#[async_trait]
pub trait DocumentDirectory: Send + Sync {
    /// Fetch a document's owner and visibility
    ///
    /// # Errors
    ///
    /// * `NotFound` - no such document
    async fn lookup(&self, document_id: Uuid) -> Result<DocumentRecord, ApiError>;
}

/// JWT claims carried by StudyCollab bearer tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Production identity provider: JWT verification plus a lock check
/// against the `users` table
pub struct JwtIdentityProvider {
    pool: PgPool,
    secret: String,
}

impl JwtIdentityProvider {
    pub fn new(pool: PgPool, secret: String) -> Self {
        Self { pool, secret }
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, ApiError> {
        let key = DecodingKey::from_secret(self.secret.as_ref());
        let validation = Validation::default();

        let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
            tracing::warn!("Token verification failed: {:?}", e);
            ApiError::Unauthenticated
        })?;
        Ok(token_data.claims)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<ResolvedIdentity, ApiError> {
        let claims = self.decode_claims(token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
            tracing::warn!("Invalid user id in token: {:?}", e);
            ApiError::Unauthenticated
        })?;

        let row: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as("SELECT locked_until FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        let locked_until = match row {
            Some((locked_until,)) => locked_until,
            None => {
                tracing::warn!("Token for unknown user {}", user_id);
                return Err(ApiError::Unauthenticated);
            }
        };

        if let Some(until) = locked_until {
            if until > Utc::now() {
                return Err(ApiError::AccountLocked);
            }
        }

        Ok(ResolvedIdentity { user_id })
    }
}

/// Production document directory backed by the `documents` table
pub struct PgDocumentDirectory {
    pool: PgPool,
}

impl PgDocumentDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentDirectory for PgDocumentDirectory {
    async fn lookup(&self, document_id: Uuid) -> Result<DocumentRecord, ApiError> {
        let row: Option<(Uuid, Uuid, bool, String)> = sqlx::query_as(
            r#"
            SELECT id, uploader_id, is_public, original_filename
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((id, owner_id, is_public, filename)) => Ok(DocumentRecord {
                id,
                owner_id,
                is_public,
                filename,
            }),
            None => Err(ApiError::not_found("Document not found")),
        }
    }
}
