use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use chrono::{NaiveDate, Utc};
use log::info;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::CurrentAdmin,
    models::{DiscountKind, NewPromo, PromoCode},
    pricing::{self, promo::normalize_code, PromoQuote, PromoRejection},
    store::Store,
    AppState,
};

#[derive(Deserialize)]
pub struct ValidatePromoRequest {
    #[serde(default)]
    code: String,
    order_total: Decimal,
}

#[derive(Deserialize)]
pub struct TogglePromoRequest {
    active: bool,
}

/// Looks up and checks `code` against `subtotal` as of `today`.
///
/// Shared by the validate endpoint and order placement so both apply the
/// same rules. Inactive and unknown codes are indistinguishable.
pub async fn validate_code(
    store: &dyn Store,
    code: &str,
    subtotal: Decimal,
    today: NaiveDate,
) -> Result<PromoQuote, ApiError> {
    let code = normalize_code(code);
    let promo = store
        .find_active_promo(&code)
        .await?
        .ok_or(PromoRejection::NotFound)?;
    Ok(pricing::promo::quote(&promo, subtotal, today)?)
}

pub async fn validate_promo(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<ValidatePromoRequest>, ApiError>,
) -> Result<Json<PromoQuote>, ApiError> {
    if form.code.trim().is_empty() {
        return Err(ApiError::validation("Code required"));
    }
    if form.order_total < Decimal::ZERO {
        return Err(ApiError::validation("Order total cannot be negative"));
    }
    if form.order_total > pricing::max_amount() {
        return Err(ApiError::validation("Order total is too large"));
    }

    let today = Utc::now().date_naive();
    let quote = validate_code(state.store.as_ref(), &form.code, form.order_total, today).await?;
    Ok(Json(quote))
}

pub async fn list_promos(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<PromoCode>>, ApiError> {
    Ok(Json(state.store.list_promos().await?))
}

pub async fn create_promo(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    WithRejection(Json(mut form), _): WithRejection<Json<NewPromo>, ApiError>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    form.code = normalize_code(&form.code);
    check_promo(&form)?;

    let id = state.store.create_promo(form).await?;
    info!("Created promo code {}", id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn toggle_promo(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(promo_id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<TogglePromoRequest>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.set_promo_active(promo_id, form.active).await? {
        return Err(ApiError::NotFound("Not found".to_string()));
    }
    info!("Promo {} active = {}", promo_id, form.active);
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_promo(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(promo_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_promo(promo_id).await? {
        return Err(ApiError::NotFound("Not found".to_string()));
    }
    Ok(Json(json!({ "success": true })))
}

fn check_promo(form: &NewPromo) -> Result<(), ApiError> {
    if form.code.is_empty() {
        return Err(ApiError::validation("Code required"));
    }
    if form.discount_value <= Decimal::ZERO {
        return Err(ApiError::validation("Discount value must be greater than 0"));
    }
    if form.discount_type == DiscountKind::Percent && form.discount_value > Decimal::ONE_HUNDRED {
        return Err(ApiError::validation("Percent discount cannot exceed 100"));
    }
    if form.min_order < Decimal::ZERO {
        return Err(ApiError::validation("Minimum order cannot be negative"));
    }
    if form.discount_value > pricing::max_amount() || form.min_order > pricing::max_amount() {
        return Err(ApiError::validation("Amount is too large"));
    }
    if form.max_uses.is_some_and(|max| max < 1) {
        return Err(ApiError::validation("Max uses must be at least 1"));
    }
    Ok(())
}
