pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod promos;

use axum::response::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
