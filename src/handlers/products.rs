use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use log::info;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::CurrentAdmin,
    models::{non_blank, Product, ProductInput, ProductType},
    pricing::{self, Resolution, Selection, VariantDraft},
    store::ProductFilter,
    AppState,
};

#[derive(Deserialize)]
pub struct ProductQuery {
    #[serde(default, rename = "type")]
    product_type: String,
}

impl ProductQuery {
    // An empty `type` means both catalogs.
    fn product_type(&self) -> Result<Option<ProductType>, ApiError> {
        match self.product_type.trim() {
            "" => Ok(None),
            raw => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::validation("Invalid product type")),
        }
    }
}

#[derive(Deserialize)]
pub struct GenerateVariantsRequest {
    #[serde(default)]
    colors: Vec<String>,
    #[serde(default)]
    sizes: Vec<String>,
    #[serde(default)]
    gsms: Vec<String>,
    #[serde(default)]
    existing: Vec<VariantDraft>,
}

pub async fn list_products(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ProductQuery>, ApiError>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = ProductFilter {
        product_type: query.product_type()?,
        active_only: true,
    };
    Ok(Json(state.store.list_products(filter).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .store
        .get_product(product_id, true)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    Ok(Json(product))
}

/// Prices a selection the same way checkout will.
pub async fn resolve_selection(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    WithRejection(Json(selection), _): WithRejection<Json<Selection>, ApiError>,
) -> Result<Json<Resolution>, ApiError> {
    let product = state
        .store
        .get_product(product_id, true)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    Ok(Json(pricing::resolve(&product, &selection)?))
}

pub async fn admin_list_products(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    WithRejection(Query(query), _): WithRejection<Query<ProductQuery>, ApiError>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let filter = ProductFilter {
        product_type: query.product_type()?,
        active_only: false,
    };
    Ok(Json(state.store.list_products(filter).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    WithRejection(Json(form), _): WithRejection<Json<ProductInput>, ApiError>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let form = validate_product(form, false)?;
    check_category(&state, form.category_id).await?;

    let id = state.store.create_product(form).await?;
    info!("Created product {}", id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(product_id): Path<Uuid>,
    WithRejection(Json(form), _): WithRejection<Json<ProductInput>, ApiError>,
) -> Result<Json<Value>, ApiError> {
    let stored = state
        .store
        .get_product(product_id, false)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found".to_string()))?;
    let form = validate_product(form, stored.is_variable && !stored.variants.is_empty())?;
    check_category(&state, form.category_id).await?;

    if !state.store.update_product(product_id, form).await? {
        return Err(ApiError::NotFound("Not found".to_string()));
    }
    info!("Updated product {}", product_id);
    Ok(Json(json!({ "success": true })))
}

pub async fn delete_product(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    if !state.store.delete_product(product_id).await? {
        return Err(ApiError::NotFound("Not found".to_string()));
    }
    info!("Deleted product {}", product_id);
    Ok(Json(json!({ "success": true })))
}

pub async fn generate_variants(
    _admin: CurrentAdmin,
    WithRejection(Json(form), _): WithRejection<Json<GenerateVariantsRequest>, ApiError>,
) -> Json<Vec<VariantDraft>> {
    Json(pricing::generate_variants(
        &form.colors,
        &form.sizes,
        &form.gsms,
        &form.existing,
    ))
}

async fn check_category(state: &AppState, category_id: Option<Uuid>) -> Result<(), ApiError> {
    if let Some(id) = category_id {
        if state.store.get_category(id).await?.is_none() {
            return Err(ApiError::validation("Category not found"));
        }
    }
    Ok(())
}

fn in_price_range(price: Decimal) -> bool {
    price <= pricing::max_amount()
}

/// Normalizes free-text fields and rejects inconsistent payloads.
///
/// A variable product must bring its variants unless it already has some
/// stored, in which case omitting `variants` keeps them.
fn validate_product(
    mut form: ProductInput,
    has_stored_variants: bool,
) -> Result<ProductInput, ApiError> {
    form.name = form.name.trim().to_string();
    if form.name.is_empty() {
        return Err(ApiError::validation("Name required"));
    }
    if form.original_price < Decimal::ZERO || form.sale_price.is_some_and(|p| p < Decimal::ZERO) {
        return Err(ApiError::validation("Prices cannot be negative"));
    }
    if !in_price_range(form.original_price) || form.sale_price.is_some_and(|p| !in_price_range(p)) {
        return Err(ApiError::validation("Price is too large"));
    }
    if form.stock < 0 {
        return Err(ApiError::validation("Stock cannot be negative"));
    }

    // A table cell replaces the base price at checkout, so it obeys the
    // same rule as a variant price.
    if let Some(table) = &form.pricing {
        let cells = table.prices.values().flat_map(|sizes| sizes.values());
        for &price in cells {
            if price <= Decimal::ZERO {
                return Err(ApiError::validation("Pricing table prices must be greater than 0"));
            }
            if !in_price_range(price) {
                return Err(ApiError::validation("Price is too large"));
            }
        }
    }

    form.description = form.description.trim().to_string();
    form.badge = non_blank(form.badge);
    form.images.retain(|url| !url.trim().is_empty());

    if !form.is_variable {
        form.variants = None;
        return Ok(form);
    }

    match form.variants.as_mut() {
        Some(variants) if !variants.is_empty() => {
            for variant in variants.iter_mut() {
                if variant.price <= Decimal::ZERO {
                    return Err(ApiError::validation("Variant price must be greater than 0"));
                }
                if !in_price_range(variant.price) {
                    return Err(ApiError::validation("Price is too large"));
                }
                if variant.stock < 0 {
                    return Err(ApiError::validation("Stock cannot be negative"));
                }
                variant.color = non_blank(variant.color.take());
                variant.size = non_blank(variant.size.take());
                variant.gsm = non_blank(variant.gsm.take());
                variant.image = non_blank(variant.image.take());
            }
        }
        None if has_stored_variants => {}
        _ => return Err(ApiError::validation("Variable products need at least one variant")),
    }
    Ok(form)
}
