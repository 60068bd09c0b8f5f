use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::ProductType;
use crate::pricing::Invoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

text_enum!(OrderStatus, "order status" {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Position on the pending -> delivered line. Cancelled is off the line.
    fn rank(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward moves along the lifecycle (skips allowed), or cancellation
    /// of a non-terminal order. Re-applying the current status is allowed.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}

/// Product-type tag of a whole order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderProductType {
    Tshirt,
    Jewellery,
    Mixed,
}

text_enum!(OrderProductType, "order product type" {
    Tshirt => "tshirt",
    Jewellery => "jewellery",
    Mixed => "mixed",
});

impl From<ProductType> for OrderProductType {
    fn from(product_type: ProductType) -> Self {
        match product_type {
            ProductType::Tshirt => OrderProductType::Tshirt,
            ProductType::Jewellery => OrderProductType::Jewellery,
        }
    }
}

impl OrderProductType {
    /// The shared type when every line has the same one, `Mixed` otherwise.
    pub fn from_items(items: &[LineItem]) -> Self {
        let mut types = items.iter().map(|item| item.product_type);
        match types.next() {
            Some(first) if types.all(|t| t == first) => first.into(),
            _ => OrderProductType::Mixed,
        }
    }
}

/// One line of a cart or a placed order. Once stored on an order it is a
/// snapshot and is never re-priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub name: String,
    #[serde(rename = "price", serialize_with = "rust_decimal::serde::float::serialize")]
    pub unit_price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub product_type: OrderProductType,
    pub items: Json<Vec<LineItem>>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub discount: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total: Decimal,
    pub promo_code: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
}

/// A fully priced order ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<Uuid>,
    pub product_type: OrderProductType,
    pub items: Vec<LineItem>,
    pub invoice: Invoice,
    pub promo_code: Option<String>,
    pub contact: CustomerContact,
}

/// Cart line as submitted at checkout. The server re-prices it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub gsm: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl OrderItemRequest {
    /// Most units of one line a single order may carry.
    pub const MAX_QUANTITY: u32 = 999;
}

impl From<&LineItem> for OrderItemRequest {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            size: item.size.clone(),
            gsm: item.gsm.clone(),
            color: item.color.clone(),
        }
    }
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub subtotal: Decimal,
    #[serde(default, serialize_with = "rust_decimal::serde::float::serialize")]
    pub discount: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total: Decimal,
    #[serde(default)]
    pub promo_code: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub customer_address: String,
    // Recomputed server-side from the priced lines.
    #[serde(default)]
    pub product_type: Option<OrderProductType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_type: ProductType) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            product_type,
            name: "Void Oversized Tee".to_string(),
            unit_price: Decimal::from(999),
            quantity: 1,
            size: None,
            gsm: None,
            color: None,
            image: None,
        }
    }

    #[test]
    fn order_type_is_shared_type_or_mixed() {
        let tees = [line(ProductType::Tshirt), line(ProductType::Tshirt)];
        assert_eq!(OrderProductType::from_items(&tees), OrderProductType::Tshirt);

        let mixed = [line(ProductType::Tshirt), line(ProductType::Jewellery)];
        assert_eq!(OrderProductType::from_items(&mixed), OrderProductType::Mixed);
    }

    #[test]
    fn status_moves_forward_or_cancels() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Shipped));

        assert!(!Shipped.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn line_item_uses_storefront_field_names() {
        let value = serde_json::to_value(line(ProductType::Jewellery)).unwrap();
        assert_eq!(value["type"], "jewellery");
        assert_eq!(value["price"], 999.0);
        assert!(value.get("size").is_none());
    }
}
