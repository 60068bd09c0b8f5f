use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use rust_decimal::Decimal;

use crate::models::{non_blank, Product, Variant};

/// Options picked by a shopper. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub gsm: Option<String>,
}

impl Selection {
    pub fn matches(&self, variant: &Variant) -> bool {
        field_matches(&self.color, &variant.color)
            && field_matches(&self.size, &variant.size)
            && field_matches(&self.gsm, &variant.gsm)
    }
}

fn field_matches(requested: &Option<String>, actual: &Option<String>) -> bool {
    match requested.as_deref().filter(|r| !r.is_empty()) {
        Some(wanted) => actual.as_deref() == Some(wanted),
        None => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub unit_price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
    /// Variant that priced the selection, for variable products.
    pub variant_id: Option<Uuid>,
    /// False when a fallback priced the selection instead of an exact match.
    pub matched: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("product {0} is variable but has no variants")]
    NoVariants(Uuid),
}

/// Effective unit price, stock and display image for `selection`.
///
/// Variable products resolve to the first variant matching the selection,
/// or to their first variant when nothing matches. Other products use the
/// sale price over the original price, unless a dynamic pricing table
/// holds a cell for the selected gsm and size.
pub fn resolve(product: &Product, selection: &Selection) -> Result<Resolution, ResolveError> {
    if product.is_variable {
        let (variant, matched) = match product.variants.iter().find(|v| selection.matches(v)) {
            Some(variant) => (variant, true),
            None => (
                product
                    .variants
                    .first()
                    .ok_or(ResolveError::NoVariants(product.id))?,
                false,
            ),
        };

        return Ok(Resolution {
            unit_price: variant.price,
            stock: variant.stock,
            image: variant
                .image
                .clone()
                .or_else(|| product.primary_image().map(String::from)),
            variant_id: Some(variant.id),
            matched,
        });
    }

    let mut resolution = Resolution {
        unit_price: product.base_price(),
        stock: product.stock,
        image: product.primary_image().map(String::from),
        variant_id: None,
        matched: true,
    };

    if let Some(pricing) = product.pricing.as_ref().map(|p| &p.0) {
        let cell = match (selection.gsm.as_deref(), selection.size.as_deref()) {
            (Some(gsm), Some(size)) => pricing.price_for(gsm, size),
            _ => None,
        };
        resolution.matched = cell.is_some();
        if let Some(price) = cell {
            resolution.unit_price = price;
        }
        if let Some(image) = selection.color.as_deref().and_then(|c| pricing.image_for(c)) {
            resolution.image = Some(image.to_string());
        }
    }

    Ok(resolution)
}

/// Variant row as edited in the admin console, before it has a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDraft {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub gsm: Option<String>,
    #[serde(default, serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image: Option<String>,
}

impl VariantDraft {
    fn key(&self) -> (Option<String>, Option<String>, Option<String>) {
        (
            non_blank(self.color.clone()),
            non_blank(self.size.clone()),
            non_blank(self.gsm.clone()),
        )
    }
}

/// Expands colour x size x gsm into variant drafts.
///
/// Blank options are dropped and an empty axis contributes a single unset
/// value. Combinations already present in `existing` keep their price,
/// stock and image.
pub fn generate_variants(
    colors: &[String],
    sizes: &[String],
    gsms: &[String],
    existing: &[VariantDraft],
) -> Vec<VariantDraft> {
    let colors = axis(colors);
    let sizes = axis(sizes);
    let gsms = axis(gsms);

    let mut drafts = Vec::with_capacity(colors.len() * sizes.len() * gsms.len());
    for color in &colors {
        for size in &sizes {
            for gsm in &gsms {
                let key = (color.clone(), size.clone(), gsm.clone());
                let draft = existing
                    .iter()
                    .find(|d| d.key() == key)
                    .cloned()
                    .unwrap_or_else(|| VariantDraft {
                        color: color.clone(),
                        size: size.clone(),
                        gsm: gsm.clone(),
                        price: None,
                        stock: 0,
                        image: None,
                    });
                drafts.push(draft);
            }
        }
    }
    drafts
}

fn axis(values: &[String]) -> Vec<Option<String>> {
    let options: Vec<Option<String>> = values
        .iter()
        .filter_map(|v| non_blank(Some(v.clone())))
        .map(Some)
        .collect();
    if options.is_empty() {
        vec![None]
    } else {
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DynamicPricing, ProductType};
    use chrono::Utc;
    use sqlx::types::Json;

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            product_type: ProductType::Tshirt,
            category_id: None,
            category_name: None,
            name: "Void Oversized Tee".to_string(),
            description: String::new(),
            original_price: Decimal::from(999),
            sale_price: None,
            stock: 12,
            is_variable: false,
            images: Json(vec!["/uploads/void-front.jpg".to_string()]),
            pricing: None,
            badge: None,
            active: true,
            created_at: Utc::now(),
            variants: Vec::new(),
        }
    }

    fn variant(product: &Product, color: &str, size: &str, price: i64) -> Variant {
        Variant {
            id: Uuid::new_v4(),
            product_id: product.id,
            color: Some(color.to_string()),
            size: Some(size.to_string()),
            gsm: None,
            price: Decimal::from(price),
            stock: 4,
            image: None,
        }
    }

    fn select(color: Option<&str>, size: Option<&str>, gsm: Option<&str>) -> Selection {
        Selection {
            color: color.map(String::from),
            size: size.map(String::from),
            gsm: gsm.map(String::from),
        }
    }

    fn variable_product() -> Product {
        let mut p = product();
        p.is_variable = true;
        p.variants = vec![variant(&p, "Black", "M", 500), variant(&p, "White", "M", 520)];
        p
    }

    #[test]
    fn exact_variant_match_sets_price() {
        let p = variable_product();
        let r = resolve(&p, &select(Some("White"), Some("M"), None)).unwrap();
        assert_eq!(r.unit_price, Decimal::from(520));
        assert_eq!(r.variant_id, Some(p.variants[1].id));
        assert!(r.matched);
    }

    #[test]
    fn unmatched_selection_falls_back_to_first_variant() {
        let p = variable_product();
        let r = resolve(&p, &select(Some("Red"), None, None)).unwrap();
        assert_eq!(r.unit_price, Decimal::from(500));
        assert_eq!(r.variant_id, Some(p.variants[0].id));
        assert!(!r.matched);
    }

    #[test]
    fn unset_fields_are_wildcards() {
        let p = variable_product();
        let r = resolve(&p, &select(None, Some("M"), Some(""))).unwrap();
        assert_eq!(r.unit_price, Decimal::from(500));
        assert!(r.matched);
    }

    #[test]
    fn variant_image_overrides_gallery() {
        let mut p = variable_product();
        p.variants[1].image = Some("/uploads/white.jpg".to_string());

        let white = resolve(&p, &select(Some("White"), None, None)).unwrap();
        assert_eq!(white.image.as_deref(), Some("/uploads/white.jpg"));

        let black = resolve(&p, &select(Some("Black"), None, None)).unwrap();
        assert_eq!(black.image.as_deref(), Some("/uploads/void-front.jpg"));
        assert_eq!(black.stock, 4);
    }

    #[test]
    fn variable_product_without_variants_is_an_error() {
        let mut p = product();
        p.is_variable = true;
        assert_eq!(
            resolve(&p, &Selection::default()),
            Err(ResolveError::NoVariants(p.id))
        );
    }

    #[test]
    fn simple_product_prefers_sale_price() {
        let mut p = product();
        p.sale_price = Some(Decimal::from(799));
        let r = resolve(&p, &Selection::default()).unwrap();
        assert_eq!(r.unit_price, Decimal::from(799));
        assert_eq!(r.stock, 12);

        p.sale_price = None;
        let r = resolve(&p, &Selection::default()).unwrap();
        assert_eq!(r.unit_price, Decimal::from(999));
    }

    #[test]
    fn dynamic_table_prices_and_images_independently() {
        let mut pricing = DynamicPricing::default();
        pricing
            .prices
            .entry("240 GSM".to_string())
            .or_default()
            .insert("XL".to_string(), Decimal::from(1149));
        pricing
            .images
            .insert("Beige".to_string(), "/uploads/beige.jpg".to_string());

        let mut p = product();
        p.sale_price = Some(Decimal::from(949));
        p.pricing = Some(Json(pricing));

        let r = resolve(&p, &select(Some("Beige"), Some("XL"), Some("240 GSM"))).unwrap();
        assert_eq!(r.unit_price, Decimal::from(1149));
        assert_eq!(r.image.as_deref(), Some("/uploads/beige.jpg"));
        assert!(r.matched);

        // colour without a table image keeps the gallery image
        let r = resolve(&p, &select(Some("Black"), Some("S"), Some("180 GSM"))).unwrap();
        assert_eq!(r.unit_price, Decimal::from(949));
        assert_eq!(r.image.as_deref(), Some("/uploads/void-front.jpg"));
        assert!(!r.matched);
    }

    #[test]
    fn generator_builds_cartesian_product_in_order() {
        let drafts = generate_variants(
            &["Black".to_string(), "White".to_string()],
            &["M".to_string(), "L".to_string()],
            &[],
            &[],
        );
        let keys: Vec<_> = drafts
            .iter()
            .map(|d| (d.color.as_deref(), d.size.as_deref(), d.gsm.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Some("Black"), Some("M"), None),
                (Some("Black"), Some("L"), None),
                (Some("White"), Some("M"), None),
                (Some("White"), Some("L"), None),
            ]
        );
        assert!(drafts.iter().all(|d| d.price.is_none()));
    }

    #[test]
    fn generator_keeps_existing_rows_and_drops_blanks() {
        let existing = VariantDraft {
            color: Some("Black".to_string()),
            size: Some("M".to_string()),
            gsm: Some(String::new()),
            price: Some(Decimal::from(650)),
            stock: 9,
            image: Some("/uploads/black.jpg".to_string()),
        };
        let drafts = generate_variants(
            &["Black".to_string(), " ".to_string()],
            &["M".to_string()],
            &[String::new()],
            &[existing.clone()],
        );
        assert_eq!(drafts, vec![existing]);
    }
}
