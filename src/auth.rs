use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::Role,
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the signed session token. Role is carried for clients, but the
/// extractor always re-reads it from the account record.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    pub role: Role,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// AuthenticatedActor
///
/// The resolved identity of an authenticated request. Every policy decision and
/// lifecycle operation receives this value explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedActor {
    pub id: Uuid,
    pub role: Role,
}

impl AuthenticatedActor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

/// issue_token
///
/// Signs an HS256 token for the account, valid for `jwt_expires_in_hours`.
pub fn issue_token(account_id: Uuid, role: Role, config: &AppConfig) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id,
        role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.jwt_expires_in_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Unknown(Box::new(e)))
}

/// verify_token
///
/// Decodes and validates a token (signature and expiry) and returns its claims.
pub fn verify_token(token: &str, config: &AppConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Session expired, please log in again".to_string())
        }
        _ => AppError::Unauthorized("Not authorized, invalid token".to_string()),
    })
}

/// hash_password
///
/// Argon2id with a fresh random salt, returned as a PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::unknown(format!("password hashing failed: {e}")))
}

/// verify_password
///
/// Returns false for a wrong password and for an unparseable stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// AuthenticatedActor Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, so any handler that names an
/// `AuthenticatedActor` argument only runs for a resolved, still-existing account.
/// Services never see headers or tokens; they receive this value explicitly.
///
/// The entire process involves:
/// 1. Dependency Resolution: the repository and `AppConfig` from the application state.
/// 2. Local Bypass: in `Env::Local`, an `x-user-id` header naming an existing account.
/// 3. Token Extraction: `Authorization: Bearer <token>`.
/// 4. Token Validation: signature and expiry against the configured secret.
/// 5. Account Lookup: the role comes from the stored account, not from the token.
///
/// Rejection: `AppError::Unauthorized` (401) with the failure envelope.
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    // S must allow sending across threads and sharing.
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    // For the JWT secret and the Env check.
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Dependency Resolution
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 2. Local Development Bypass
        // An unknown or malformed id falls through to the token check.
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = bypass_id {
                if let Some(account) = repo.find_account(user_id).await? {
                    tracing::debug!(account_id = %account.id, "authenticated via local bypass header");
                    return Ok(AuthenticatedActor::new(account.id, account.role));
                }
            }
        }

        // 3. Token Extraction
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

        // 4. Token Validation
        let claims = verify_token(token, &config)?;

        // 5. Account Lookup
        let account = repo.find_account(claims.sub).await?.ok_or_else(|| {
            AppError::Unauthorized("The account for this token no longer exists".to_string())
        })?;

        Ok(AuthenticatedActor::new(account.id, account.role))
    }
}
