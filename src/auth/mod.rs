use crate::{
    db::Database,
    models::{Role, User},
    utils::{ApiError, ApiResult, Config},
};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub const TOKEN_ISSUER: &str = "devcamper-api";

/// Lifetime of a password reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id, hex ObjectId
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

/// Authenticated user context
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub user: User,
}

impl AuthUser {
    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }

    /// Refuse roles outside `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.user.role) {
            Ok(())
        } else {
            Err(ApiError::authorization_error(format!(
                "User role {} is not authorized to access this route",
                self.user.role.as_str()
            )))
        }
    }

    /// Refuse writes to records owned by someone else, unless admin
    pub fn ensure_owner(&self, owner: ObjectId, action: &str) -> ApiResult<()> {
        if owner == self.id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::authentication_error(format!(
                "User {} is not authorized to {}",
                self.id.to_hex(),
                action
            )))
        }
    }
}

/// Authentication service
pub struct AuthService {
    db: Database,
    config: Arc<Config>,
    argon2: Argon2<'static>,
}

impl AuthService {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self {
            db,
            config,
            argon2: Argon2::default(),
        }
    }

    /// Authenticate user with email/password
    pub async fn authenticate_user(&self, email: &str, password: &str) -> ApiResult<User> {
        let user = self
            .db
            .users()
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or_else(|| ApiError::authentication_error("Invalid credentials"))?;

        if !self.verify_password(password, &user.password) {
            return Err(ApiError::authentication_error("Invalid credentials"));
        }

        Ok(user)
    }

    /// Sign a JWT for the user
    pub fn issue_token(&self, user_id: ObjectId) -> ApiResult<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.config.jwt.expiration_hours as i64);
        let claims = Claims {
            sub: user_id.to_hex(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: TOKEN_ISSUER.to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt.secret.as_ref()),
        )
        .map_err(|_| ApiError::internal_error("Failed to generate token"))?;

        Ok((token, expires_at))
    }

    /// Validate JWT token and return the user id it names
    pub fn validate_jwt_token(&self, token: &str) -> ApiResult<ObjectId> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt.secret.as_ref()),
            &validation,
        )
        .map_err(|_| ApiError::not_authorized())?;

        ObjectId::parse_str(&token_data.claims.sub).map_err(|_| ApiError::not_authorized())
    }

    /// Get user by id
    pub async fn get_user(&self, user_id: ObjectId) -> ApiResult<Option<User>> {
        Ok(self.db.users().find_one(doc! { "_id": user_id }).await?)
    }

    /// Hash password for storage
    pub fn hash_password(&self, password: &str) -> ApiResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| ApiError::internal_error("Failed to hash password"))?;
        Ok(password_hash.to_string())
    }

    pub fn verify_password(&self, password: &str, stored_hash: &str) -> bool {
        PasswordHash::new(stored_hash)
            .map(|parsed| {
                self.argon2
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Fresh reset token: the raw value for the user, and its digest for storage
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    let hashed = hash_reset_token(&token);
    (token, hashed)
}

pub fn hash_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Extract authentication from request headers
pub fn extract_auth_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authentication middleware for private routes (401 without a valid bearer token)
pub async fn protect(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_auth_token(request.headers()).ok_or_else(ApiError::not_authorized)?;
    let user_id = auth_service.validate_jwt_token(&token)?;

    let user = auth_service
        .get_user(user_id)
        .await?
        .ok_or_else(ApiError::not_authorized)?;

    tracing::debug!(user = %user_id, role = user.role.as_str(), "Request authenticated");
    request.extensions_mut().insert(AuthUser { id: user_id, user });

    Ok(next.run(request).await)
}
