use axum::{
    extract::{Query, State},
    response::Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    error::ApiError,
    middleware::CurrentAdmin,
    models::DashboardStats,
    store::DateRange,
    AppState,
};

// Dates arrive as strings so an empty `from=` means "unbounded" rather
// than a rejected request.
#[derive(Deserialize)]
pub struct DashboardQuery {
    from: Option<String>,
    to: Option<String>,
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::validation("Dates must be YYYY-MM-DD")),
        None => Ok(None),
    }
}

pub async fn dashboard(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    WithRejection(Query(query), _): WithRejection<Query<DashboardQuery>, ApiError>,
) -> Result<Json<DashboardStats>, ApiError> {
    let range = DateRange {
        from: parse_date(query.from.as_deref())?,
        to: parse_date(query.to.as_deref())?,
    };
    Ok(Json(state.store.dashboard(range).await?))
}
