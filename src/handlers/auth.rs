use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::CurrentCustomer,
    models::{NewUser, UserResponse},
    utils::{create_token, hash_password, verify_password, AdminClaims, Claims},
    AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        return Err(ApiError::validation("Email and password required"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation("Password must be at least 6 characters"));
    }

    let password_hash = hash_password(&form.password)?;
    let user = state
        .store
        .create_user(NewUser {
            name: form.name.trim().to_string(),
            email,
            password_hash,
        })
        .await?;

    let token = create_token(&Claims::new(&user), &state.config.jwt_secret)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = form.email.trim().to_lowercase();
    if email.is_empty() || form.password.is_empty() {
        return Err(ApiError::validation("Email and password required"));
    }

    let invalid = || ApiError::Auth("Invalid email or password".to_string());
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&form.password, &user.password_hash).unwrap_or(false) {
        return Err(invalid());
    }

    let token = create_token(&Claims::new(&user), &state.config.jwt_secret)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

pub async fn me(CurrentCustomer(claims): CurrentCustomer) -> Json<Value> {
    Json(json!({
        "user": {
            "id": claims.sub,
            "email": claims.email,
            "name": claims.name,
        }
    }))
}

pub async fn admin_login(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<AdminLoginRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    if form.username != state.config.admin_id || form.password != state.config.admin_pass {
        return Err(ApiError::Auth("Invalid admin credentials".to_string()));
    }

    let token = create_token(&AdminClaims::new(&form.username), &state.config.admin_jwt_secret)?;
    Ok(Json(json!({ "token": token })))
}
