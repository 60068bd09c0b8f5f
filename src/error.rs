use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::{
    pricing::{PromoRejection, ResolveError},
    store::StoreError,
};

/// Every failure a handler can return. Rendered as `{"error": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Server(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Server(detail) => {
                error!("request failed: {}", detail);
                "Server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => ApiError::Conflict(message),
            StoreError::PromoUnavailable(code) => {
                warn!("promo {} could not be redeemed at order placement", code);
                PromoRejection::LimitReached.into()
            }
            StoreError::Database(e) => ApiError::Server(e.to_string()),
        }
    }
}

impl From<PromoRejection> for ApiError {
    fn from(rejection: PromoRejection) -> Self {
        match rejection {
            PromoRejection::NotFound => ApiError::NotFound(rejection.to_string()),
            _ => ApiError::Validation(rejection.to_string()),
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoVariants(_) => {
                ApiError::Validation("Product has no purchasable variants".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Server(format!("password hashing failed: {}", err))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Server(format!("token signing failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn promo_rejections_map_to_taxonomy() {
        let not_found: ApiError = PromoRejection::NotFound.into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let minimum: ApiError = PromoRejection::BelowMinimum {
            minimum: Decimal::from(1000),
        }
        .into();
        assert_eq!(minimum.status(), StatusCode::BAD_REQUEST);
        assert_eq!(minimum.to_string(), "Minimum order ₹1000 required");
    }

    #[test]
    fn exhausted_promo_at_placement_is_limit_reached() {
        let err: ApiError = StoreError::PromoUnavailable("ZUED10".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Promo code usage limit reached");
    }
}
