use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    error::ApiError,
    utils::{verify_token, AdminClaims, Claims},
    AppState,
};

/// A request carrying a valid customer bearer token.
#[derive(Debug, Clone)]
pub struct CurrentCustomer(pub Claims);

/// A request carrying a valid admin bearer token.
#[derive(Debug, Clone)]
pub struct CurrentAdmin(pub AdminClaims);

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Result<String, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Auth("No token".to_string()))?;
    Ok(bearer.token().to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentCustomer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state).await?;
        let claims = verify_token::<Claims>(&token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Auth("Invalid token".to_string()))?;
        Ok(Self(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts, state)
            .await
            .map_err(|_| ApiError::Auth("No admin token".to_string()))?;
        let claims = verify_token::<AdminClaims>(&token, &state.config.admin_jwt_secret)
            .ok()
            .filter(|claims| claims.role == AdminClaims::ROLE)
            .ok_or_else(|| ApiError::Auth("Invalid admin token".to_string()))?;
        Ok(Self(claims))
    }
}
