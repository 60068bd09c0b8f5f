use serde::Serialize;
use rust_decimal::Decimal;

use super::PromoQuote;
use crate::models::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Invoice {
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub discount: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub total: Decimal,
}

impl Invoice {
    /// True when the three amounts equal `self`, whatever their scale.
    pub fn agrees_with(&self, subtotal: Decimal, discount: Decimal, total: Decimal) -> bool {
        self.subtotal == subtotal && self.discount == discount && self.total == total
    }
}

/// Largest amount a `NUMERIC(10,2)` money column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

pub fn subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_total).sum()
}

/// Sums the lines and applies a promo quote, if one was accepted.
/// The total never goes below zero.
pub fn price_order(items: &[LineItem], promo: Option<&PromoQuote>) -> Invoice {
    let subtotal = subtotal(items);
    let discount = promo
        .filter(|quote| quote.valid)
        .map(|quote| quote.discount.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO);

    Invoice {
        subtotal,
        discount,
        total: (subtotal - discount).max(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiscountKind, ProductType};
    use crate::pricing::promo::discount_for;
    use uuid::Uuid;

    fn item(price: i64, quantity: u32) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(),
            product_type: ProductType::Tshirt,
            name: "Midnight Baggy Drop".to_string(),
            unit_price: Decimal::from(price),
            quantity,
            size: Some("M".to_string()),
            gsm: None,
            color: None,
            image: None,
        }
    }

    fn quote(kind: DiscountKind, value: i64, subtotal: Decimal) -> PromoQuote {
        PromoQuote {
            valid: true,
            discount: discount_for(kind, Decimal::from(value), subtotal).unwrap(),
            discount_type: kind,
            discount_value: Decimal::from(value),
            code: "TEST".to_string(),
        }
    }

    #[test]
    fn no_promo_means_no_discount() {
        let invoice = price_order(&[item(500, 2), item(300, 1)], None);
        assert_eq!(invoice.subtotal, Decimal::from(1300));
        assert_eq!(invoice.discount, Decimal::ZERO);
        assert_eq!(invoice.total, Decimal::from(1300));
    }

    #[test]
    fn oversized_flat_promo_zeroes_the_total() {
        let items = [item(500, 2), item(300, 1)];
        let promo = quote(DiscountKind::Flat, 2000, subtotal(&items));

        let invoice = price_order(&items, Some(&promo));
        assert_eq!(invoice.discount, Decimal::from(1300));
        assert_eq!(invoice.total, Decimal::ZERO);
    }

    #[test]
    fn percent_promo_on_two_thousand() {
        let items = [item(1000, 2)];
        let promo = quote(DiscountKind::Percent, 10, subtotal(&items));

        let invoice = price_order(&items, Some(&promo));
        assert_eq!(invoice.discount, Decimal::from(200));
        assert_eq!(invoice.total, Decimal::from(1800));
    }

    #[test]
    fn invalid_quote_is_ignored_and_total_never_negative() {
        let items = [item(100, 1)];
        let mut promo = quote(DiscountKind::Flat, 50, subtotal(&items));
        promo.valid = false;
        assert_eq!(price_order(&items, Some(&promo)).total, Decimal::from(100));

        promo.valid = true;
        promo.discount = Decimal::from(250);
        let invoice = price_order(&items, Some(&promo));
        assert_eq!(invoice.total, Decimal::ZERO);
        assert!(invoice.discount >= Decimal::ZERO);
    }

    #[test]
    fn agreement_ignores_scale() {
        let invoice = price_order(&[item(500, 1)], None);
        assert!(invoice.agrees_with(
            Decimal::new(50000, 2),
            Decimal::new(0, 2),
            Decimal::new(50000, 2)
        ));
        assert!(!invoice.agrees_with(Decimal::from(499), Decimal::ZERO, Decimal::from(499)));
    }
}
