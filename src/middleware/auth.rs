use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

fn is_public_path(path: &str) -> bool {
    path == "/"
        || path == "/api/health"
        || path == "/api/auth/register"
        || path == "/api/auth/login"
        || path == "/api/leaderboard"
        || path == "/api/bonds"
        || path.starts_with("/api/bonds/")
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let path = req.uri().path();
    if is_public_path(path) {
        return Ok(next.run(req).await);
    }

    // 401 with the standard envelope so clients can surface the message.
    fn auth_declined_response() -> Response {
        let body = serde_json::json!({
            "success": false,
            "message": "Not authorized, no token"
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }

    let auth_header = match req.headers().get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        Some(h) => h,
        None => return Ok(auth_declined_response()),
    };

    if !auth_header.starts_with("Bearer ") {
        return Ok(auth_declined_response());
    }

    let token = &auth_header[7..];

    let decoding_key = DecodingKey::from_secret(state.config.jwt_secret.as_ref());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(d) => d,
        Err(_) => return Ok(auth_declined_response()),
    };

    let claims = token_data.claims;

    let user_id = match Uuid::parse_str(&claims.user_id) {
        Ok(u) => u,
        Err(_) => return Ok(auth_declined_response()),
    };

    // Token may outlive the account; check the user still exists.
    let user_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)",
    )
    .bind(user_id)
    .fetch_one(&*state.db_pool)
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !user_exists {
        return Ok(auth_declined_response());
    }

    let auth_user = AuthUser {
        user_id,
        email: claims.email,
    };
    req.extensions_mut().insert(auth_user);

    Ok(next.run(req).await)
}
