use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use crate::handlers::{db_error, error_response, ApiError};
use crate::middleware::auth::{AuthUser, Claims};
use crate::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub wallet: WalletView,
    pub role: String,
    pub is_verified: bool,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Serialize)]
pub struct WalletView {
    pub balance: f64,
    pub currency: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUserView,
}

fn generate_jwt_token(
    user_id: &Uuid,
    email: &str,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::seconds(expiration_secs as i64)).timestamp() as usize;
    let claims = Claims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        exp,
    };

    let header = Header::new(Algorithm::HS256);
    let encoding_key = EncodingKey::from_secret(secret.as_ref());
    encode(&header, &claims, &encoding_key)
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Name is required"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(error_response(StatusCode::BAD_REQUEST, "A valid email is required"));
    }
    if payload.password.len() < 6 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters",
        ));
    }

    let email_taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
    )
    .bind(&email)
    .fetch_one(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error checking email", e))?;

    if email_taken {
        return Err(error_response(StatusCode::BAD_REQUEST, "Email already registered"));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Error hashing password: {:?}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error creating account")
    })?;

    let user_id = Uuid::new_v4();
    let now = Utc::now();
    let starting_balance = state.config.starting_balance;

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, wallet_balance, wallet_currency, created_at)
        VALUES ($1, $2, $3, $4, $5, 'INR', $6)
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .bind(starting_balance)
    .bind(now)
    .execute(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error creating user", e))?;

    let token = generate_jwt_token(&user_id, &email, &state.config.jwt_secret, state.config.jwt_expiration)
        .map_err(|e| {
            tracing::error!("Error generating token: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error creating account")
        })?;

    let response = AuthResponse {
        token,
        user: AuthUserView {
            id: user_id.to_string(),
            name: name.to_string(),
            email,
            wallet: WalletView {
                balance: starting_balance,
                currency: "INR".to_string(),
            },
            role: "user".to_string(),
            is_verified: false,
            created_at: now,
        },
    };

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "Account created successfully",
            "data": response
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Email is required"));
    }
    if payload.password.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Password is required"));
    }

    let user = sqlx::query(
        r#"
        SELECT id, name, email, password_hash, wallet_balance, wallet_currency,
               role, is_verified, created_at
        FROM users WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching user", e))?;

    let user = user.ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;

    let password_hash: String = user
        .try_get("password_hash")
        .map_err(|e| db_error("Error reading user row", e))?;

    let valid = verify(&payload.password, &password_hash).unwrap_or(false);
    if !valid {
        return Err(error_response(StatusCode::UNAUTHORIZED, "Invalid email or password"));
    }

    let user_id: Uuid = user.try_get("id").map_err(|e| db_error("Error reading user row", e))?;

    let token = generate_jwt_token(&user_id, &email, &state.config.jwt_secret, state.config.jwt_expiration)
        .map_err(|e| {
            tracing::error!("Error generating token: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error logging in")
        })?;

    let response = AuthResponse {
        token,
        user: AuthUserView {
            id: user_id.to_string(),
            name: user.try_get("name").map_err(|e| db_error("Error reading user row", e))?,
            email,
            wallet: WalletView {
                balance: user.try_get("wallet_balance").map_err(|e| db_error("Error reading user row", e))?,
                currency: user.try_get("wallet_currency").map_err(|e| db_error("Error reading user row", e))?,
            },
            role: user.try_get("role").map_err(|e| db_error("Error reading user row", e))?,
            is_verified: user.try_get("is_verified").map_err(|e| db_error("Error reading user row", e))?,
            created_at: user.try_get("created_at").map_err(|e| db_error("Error reading user row", e))?,
        },
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Logged in successfully",
        "data": response
    })))
}

/// Current user's profile including the live wallet balance.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = sqlx::query(
        r#"
        SELECT id, name, email, wallet_balance, wallet_currency, role, is_verified, created_at
        FROM users WHERE id = $1
        "#,
    )
    .bind(auth_user.user_id)
    .fetch_optional(&*state.db_pool)
    .await
    .map_err(|e| db_error("Error fetching user", e))?
    .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "User not found"))?;

    let view = AuthUserView {
        id: auth_user.user_id.to_string(),
        name: user.try_get("name").map_err(|e| db_error("Error reading user row", e))?,
        email: user.try_get("email").map_err(|e| db_error("Error reading user row", e))?,
        wallet: WalletView {
            balance: user.try_get("wallet_balance").map_err(|e| db_error("Error reading user row", e))?,
            currency: user.try_get("wallet_currency").map_err(|e| db_error("Error reading user row", e))?,
        },
        role: user.try_get("role").map_err(|e| db_error("Error reading user row", e))?,
        is_verified: user.try_get("is_verified").map_err(|e| db_error("Error reading user row", e))?,
        created_at: user.try_get("created_at").map_err(|e| db_error("Error reading user row", e))?,
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "data": { "user": view }
    })))
}
