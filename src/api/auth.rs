use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::routes::AppState;
use crate::error::{ApiError, ApiResult};
use crate::persistence;

/// JWT claims: `sub` = user id (Uuid as string), `exp` (expiry), `iat` (issued at).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated user extracted from JWT Bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Stored credential, keyed by lowercase username in the user store.
#[derive(Clone)]
pub struct AuthUserCredential {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: String,
}

const JWT_EXPIRY_HOURS: i64 = 24;

impl Claims {
    pub fn new(user_id: Uuid) -> Self {
        let now = chrono::Utc::now();
        let exp = (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp();
        Self {
            sub: user_id.to_string(),
            exp,
            iat: now.timestamp(),
        }
    }
}

pub fn create_token(secret: &[u8], user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token(secret: &[u8], token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)?;
    Ok(token_data.claims)
}

/// Argon2id hash in PHC string format.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authorization header missing".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header format".into()))?;

        let claims = decode_token(&state.jwt_secret, token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        let known = state
            .user_store
            .read()
            .await
            .values()
            .any(|cred| cred.user_id == user_id);
        if !known {
            return Err(ApiError::Unauthorized("User not found".into()));
        }
        Ok(AuthUser { user_id })
    }
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let username = body.username.trim().to_lowercase();
    if username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".into(),
        ));
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;
    let user_id = Uuid::new_v4();

    let mut users = state.user_store.write().await;
    if users.contains_key(&username) {
        return Err(ApiError::BadRequest("Username already taken".into()));
    }
    if let Some(pool) = &state.db {
        persistence::insert_user(pool, user_id, &username, &password_hash).await?;
    }
    users.insert(
        username.clone(),
        AuthUserCredential {
            user_id,
            username: username.clone(),
            password_hash,
        },
    );
    tracing::info!(%user_id, username = %username, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, username }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let username = body.username.trim().to_lowercase();
    let cred = state.user_store.read().await.get(&username).cloned();
    let Some(cred) = cred.filter(|c| verify_password(&body.password, &c.password_hash)) else {
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    };
    let token = create_token(&state.jwt_secret, cred.user_id)
        .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))?;
    Ok(Json(LoginResponse {
        token,
        user_id: cred.user_id,
    }))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<RegisterResponse>> {
    let users = state.user_store.read().await;
    let cred = users
        .values()
        .find(|c| c.user_id == auth.user_id)
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(RegisterResponse {
        user_id: cred.user_id,
        username: cred.username.clone(),
    }))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// POST /auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.current_password.is_empty() || body.new_password.is_empty() {
        return Err(ApiError::BadRequest(
            "Current password and new password are required".into(),
        ));
    }

    let mut users = state.user_store.write().await;
    let cred = users
        .values_mut()
        .find(|c| c.user_id == auth.user_id)
        .ok_or(ApiError::NotFound("User"))?;
    if !verify_password(&body.current_password, &cred.password_hash) {
        return Err(ApiError::Unauthorized("Current password is incorrect".into()));
    }

    let password_hash = hash_password(&body.new_password)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;
    if let Some(pool) = &state.db {
        persistence::update_password(pool, auth.user_id, &password_hash).await?;
    }
    cred.password_hash = password_hash;
    tracing::info!(user_id = %auth.user_id, "changed password");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Password changed successfully",
    })))
}
