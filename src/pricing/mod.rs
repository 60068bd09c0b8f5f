//! Price resolution for cart lines, promo validation and order totals.

pub mod invoice;
pub mod promo;
pub mod variant;

pub use invoice::{max_amount, price_order, subtotal, Invoice};
pub use promo::{PromoQuote, PromoRejection};
pub use variant::{generate_variants, resolve, Resolution, ResolveError, Selection, VariantDraft};
