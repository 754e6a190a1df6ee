use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use atelier_core::identity::User;
use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/register", post(register))
        .route("/v1/auth/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if payload.email.is_empty() || !payload.email.contains('@') {
        return Err(AppError::ValidationError("invalid email address".into()));
    }
    if payload.password.len() < 8 {
        return Err(AppError::ValidationError(
            "password must be at least 8 characters".into(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("password hashing: {e}")))?
        .to_string();

    let user = User::new(payload.email, payload.name, password_hash);
    state.users.insert(&user).await?;

    tracing::info!(user_id = %user.id, "registered new customer");
    issue_token(&state, &user)
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("invalid credentials".into()))?;

    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("stored hash: {e}")))?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed)
        .map_err(|_| AppError::AuthenticationError("invalid credentials".into()))?;

    issue_token(&state, &user)
}

fn issue_token(state: &AppState, user: &User) -> Result<Json<AuthResponse>, AppError> {
    let claims = CustomerClaims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(anyhow::anyhow!("token encoding: {e}")))?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
        },
    }))
}
