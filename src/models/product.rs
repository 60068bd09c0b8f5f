use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Tshirt,
    Jewellery,
}

text_enum!(ProductType, "product type" {
    Tshirt => "tshirt",
    Jewellery => "jewellery",
});

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub product_type: ProductType,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub original_price: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub sale_price: Option<Decimal>,
    /// Authoritative only when `is_variable` is false.
    pub stock: i32,
    pub is_variable: bool,
    pub images: Json<Vec<String>>,
    pub pricing: Option<Json<DynamicPricing>>,
    pub badge: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Sale price when one is set, the original price otherwise.
    pub fn base_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.original_price)
    }

    pub fn primary_image(&self) -> Option<&str> {
        self.images.0.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub color: Option<String>,
    pub size: Option<String>,
    pub gsm: Option<String>,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
}

/// Price table for non-variant products priced along two axes.
///
/// `prices` is keyed by gsm, then size. `images` maps a colour to its
/// display image and is looked up independently of `prices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicPricing {
    #[serde(default, serialize_with = "prices_as_numbers")]
    pub prices: BTreeMap<String, BTreeMap<String, Decimal>>,
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

fn prices_as_numbers<S: Serializer>(
    prices: &BTreeMap<String, BTreeMap<String, Decimal>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let table: BTreeMap<&str, BTreeMap<&str, f64>> = prices
        .iter()
        .map(|(gsm, sizes)| {
            let row = sizes
                .iter()
                .filter_map(|(size, price)| price.to_f64().map(|p| (size.as_str(), p)))
                .collect();
            (gsm.as_str(), row)
        })
        .collect();
    table.serialize(serializer)
}

impl DynamicPricing {
    pub fn price_for(&self, gsm: &str, size: &str) -> Option<Decimal> {
        self.prices.get(gsm)?.get(size).copied()
    }

    pub fn image_for(&self, color: &str) -> Option<&str> {
        self.images.get(color).map(String::as_str)
    }
}

/// Admin payload for creating or editing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub product_type: ProductType,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub original_price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub is_variable: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub pricing: Option<DynamicPricing>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// `None` on edit keeps the stored variants.
    #[serde(default)]
    pub variants: Option<Vec<VariantInput>>,
}

fn default_active() -> bool {
    true
}

impl ProductInput {
    /// Stock written to the product row. Variable products track stock per variant.
    pub fn stored_stock(&self) -> i32 {
        if self.is_variable {
            0
        } else {
            self.stock
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantInput {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub gsm: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image: Option<String>,
}
