use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Percent,
    Flat,
}

text_enum!(DiscountKind, "discount type" {
    Percent => "percent",
    Flat => "flat",
});

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub id: Uuid,
    /// Always stored upper-cased.
    pub code: String,
    #[sqlx(try_from = "String")]
    pub discount_type: DiscountKind,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub discount_value: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub min_order: Decimal,
    /// `None` means unlimited redemptions.
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub active: bool,
    pub expires_at: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    /// Whether another redemption may be granted.
    pub fn has_redemptions_left(&self) -> bool {
        match self.max_uses {
            Some(max) => self.used_count < max,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPromo {
    pub code: String,
    pub discount_type: DiscountKind,
    pub discount_value: Decimal,
    #[serde(default)]
    pub min_order: Decimal,
    #[serde(default)]
    pub max_uses: Option<i32>,
    #[serde(default)]
    pub expires_at: Option<NaiveDate>,
}
