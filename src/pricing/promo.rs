use serde::{Deserialize, Serialize};
use thiserror::Error;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{DiscountKind, PromoCode};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PromoRejection {
    #[error("Invalid or expired promo code")]
    NotFound,

    #[error("Promo code expired")]
    Expired,

    #[error("Promo code usage limit reached")]
    LimitReached,

    #[error("Minimum order ₹{minimum} required")]
    BelowMinimum { minimum: Decimal },

    #[error("Order total is too large")]
    AmountTooLarge,
}

/// Advisory result of validating a code. It does not reserve a redemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoQuote {
    pub valid: bool,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub discount: Decimal,
    pub discount_type: DiscountKind,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub discount_value: Decimal,
    pub code: String,
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Checks an active promo against an order subtotal on `today`.
///
/// Checks run in order (expiry, redemption limit, minimum order) and the
/// first failure wins. Looking the code up, and rejecting inactive codes,
/// is the caller's job.
pub fn quote(
    promo: &PromoCode,
    subtotal: Decimal,
    today: NaiveDate,
) -> Result<PromoQuote, PromoRejection> {
    if promo.expires_at.is_some_and(|expiry| expiry < today) {
        return Err(PromoRejection::Expired);
    }
    if !promo.has_redemptions_left() {
        return Err(PromoRejection::LimitReached);
    }
    if promo.min_order > Decimal::ZERO && subtotal < promo.min_order {
        return Err(PromoRejection::BelowMinimum {
            minimum: promo.min_order,
        });
    }

    Ok(PromoQuote {
        valid: true,
        discount: discount_for(promo.discount_type, promo.discount_value, subtotal)
            .ok_or(PromoRejection::AmountTooLarge)?,
        discount_type: promo.discount_type,
        discount_value: promo.discount_value,
        code: promo.code.clone(),
    })
}

/// Percent discounts round half-up to whole currency units; flat discounts
/// never exceed the subtotal. `None` when the amount does not fit a `Decimal`.
pub fn discount_for(kind: DiscountKind, value: Decimal, subtotal: Decimal) -> Option<Decimal> {
    match kind {
        DiscountKind::Percent => Some(
            subtotal
                .checked_mul(value)?
                .checked_div(Decimal::ONE_HUNDRED)?
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        ),
        DiscountKind::Flat => Some(value.min(subtotal)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn promo(kind: DiscountKind, value: i64) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: "ZUED10".to_string(),
            discount_type: kind,
            discount_value: Decimal::from(value),
            min_order: Decimal::ZERO,
            max_uses: None,
            used_count: 0,
            active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        day(2026, 3, 14)
    }

    #[test]
    fn percent_rounds_half_up() {
        let q = quote(&promo(DiscountKind::Percent, 15), Decimal::from(999), today()).unwrap();
        assert_eq!(q.discount, Decimal::from(150));

        assert_eq!(
            discount_for(DiscountKind::Percent, Decimal::from(10), Decimal::from(1005)),
            Some(Decimal::from(101))
        );
        assert_eq!(
            discount_for(DiscountKind::Percent, Decimal::from(10), Decimal::from(1004)),
            Some(Decimal::from(100))
        );
    }

    #[test]
    fn flat_discount_is_clamped_to_subtotal() {
        let q = quote(&promo(DiscountKind::Flat, 2000), Decimal::from(1300), today()).unwrap();
        assert_eq!(q.discount, Decimal::from(1300));

        let q = quote(&promo(DiscountKind::Flat, 200), Decimal::from(1300), today()).unwrap();
        assert_eq!(q.discount, Decimal::from(200));
    }

    #[test]
    fn redemption_limit_boundary() {
        let mut p = promo(DiscountKind::Flat, 100);
        p.max_uses = Some(5);

        p.used_count = 4;
        assert!(quote(&p, Decimal::from(500), today()).is_ok());

        p.used_count = 5;
        assert_eq!(
            quote(&p, Decimal::from(500), today()),
            Err(PromoRejection::LimitReached)
        );
    }

    #[test]
    fn minimum_order_boundary() {
        let mut p = promo(DiscountKind::Percent, 10);
        p.min_order = Decimal::from(1000);

        assert!(quote(&p, Decimal::from(1000), today()).is_ok());
        assert_eq!(
            quote(&p, Decimal::from(999), today()),
            Err(PromoRejection::BelowMinimum {
                minimum: Decimal::from(1000)
            })
        );
    }

    #[test]
    fn expiry_date_is_inclusive() {
        let mut p = promo(DiscountKind::Flat, 100);

        p.expires_at = Some(today());
        assert!(quote(&p, Decimal::from(500), today()).is_ok());

        p.expires_at = Some(day(2026, 3, 13));
        assert_eq!(
            quote(&p, Decimal::from(500), today()),
            Err(PromoRejection::Expired)
        );
    }

    #[test]
    fn checks_short_circuit_in_order() {
        let mut p = promo(DiscountKind::Flat, 100);
        p.expires_at = Some(day(2025, 1, 1));
        p.max_uses = Some(1);
        p.used_count = 1;
        p.min_order = Decimal::from(10_000);

        assert_eq!(quote(&p, Decimal::ONE, today()), Err(PromoRejection::Expired));

        p.expires_at = None;
        assert_eq!(
            quote(&p, Decimal::ONE, today()),
            Err(PromoRejection::LimitReached)
        );
    }

    #[test]
    fn huge_subtotal_is_rejected_not_overflowed() {
        let p = promo(DiscountKind::Percent, 10);
        assert_eq!(
            quote(&p, Decimal::MAX, today()),
            Err(PromoRejection::AmountTooLarge)
        );
        assert_eq!(
            discount_for(DiscountKind::Flat, Decimal::from(100), Decimal::MAX),
            Some(Decimal::from(100))
        );
    }

    #[test]
    fn codes_are_upper_cased() {
        assert_eq!(normalize_code("  zued10 "), "ZUED10");
    }
}
