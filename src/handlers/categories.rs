use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::WithRejection;
use log::info;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::CurrentAdmin,
    models::{Category, NewCategory},
    AppState,
};

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.list_categories().await?))
}

pub async fn admin_list_categories(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.list_categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    WithRejection(Json(mut form), _): WithRejection<Json<NewCategory>, ApiError>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    form.name = form.name.trim().to_string();
    if form.name.is_empty() {
        return Err(ApiError::validation("Name required"));
    }

    // The tree is two levels deep: a parent must itself be a root.
    if let Some(parent_id) = form.parent_id {
        let parent = state
            .store
            .get_category(parent_id)
            .await?
            .ok_or_else(|| ApiError::validation("Parent category not found"))?;
        if !parent.is_root() {
            return Err(ApiError::validation("Subcategories cannot have children"));
        }
    }

    let category = state.store.create_category(form).await?;
    info!("Created category {} ({})", category.name, category.id);
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(category_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let removed = state.store.delete_category(category_id).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Not found".to_string()));
    }

    info!("Deleted category {} and {} child rows", category_id, removed - 1);
    Ok(Json(json!({ "success": true })))
}
