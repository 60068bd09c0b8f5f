use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{OrderProductType, OrderStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct Totals {
    pub count: i64,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderSummary {
    pub id: Uuid,
    pub customer_name: String,
    #[sqlx(try_from = "String")]
    pub product_type: OrderProductType,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total: Decimal,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct StatusCount {
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total: Totals,
    pub tshirt: Totals,
    pub jewellery: Totals,
    pub recent_orders: Vec<OrderSummary>,
    pub status_breakdown: Vec<StatusCount>,
}
