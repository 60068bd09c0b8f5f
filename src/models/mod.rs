use thiserror::Error;

/// Returned when a stored or submitted tag does not name a known variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// Enums persisted as TEXT columns. Rows decode them with
// `#[sqlx(try_from = "String")]`, queries bind `as_str()`.
macro_rules! text_enum {
    ($name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::models::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod category;
pub mod dashboard;
pub mod order;
pub mod product;
pub mod promo;
pub mod user;

pub use category::{Category, CategoryScope, NewCategory};
pub use dashboard::{DashboardStats, OrderSummary, StatusCount, Totals};
pub use order::{
    CreateOrderRequest, CustomerContact, LineItem, NewOrder, Order, OrderItemRequest,
    OrderProductType, OrderStatus,
};
pub use product::{DynamicPricing, Product, ProductInput, ProductType, Variant, VariantInput};
pub use promo::{DiscountKind, NewPromo, PromoCode};
pub use user::{NewUser, User, UserResponse};

/// Trims a free-text field and drops it when nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
