use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::{CartLine, PriceSource, Product};

/// Flat shipping surcharge, added once per cart.
pub const SHIPPING_FEE: i64 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("no price available for this product")]
    NoPriceAvailable,
}

/// Variant selection as sent by the client, reduced to identifying markers.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Selection {
    pub measurement: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub price: i64,
    pub offer_price: Option<i64>,
    pub source: PriceSource,
}

impl ResolvedPrice {
    pub fn effective(&self) -> i64 {
        self.offer_price.unwrap_or(self.price)
    }
}

/// Resolve the unit price for a product under an optional variant selection.
///
/// A measurement selection always wins over a simultaneously supplied color
/// selection; with neither, the base price applies. At each level the offer
/// price is preferred when present.
pub fn resolve_price(product: &Product, selection: &Selection) -> Result<ResolvedPrice, PricingError> {
    if let Some(label) = selection.measurement.as_deref() {
        let options = product.measurements.as_deref().unwrap_or(&[]);
        let option = options
            .iter()
            .find(|m| m.measurement == label)
            .ok_or_else(|| {
                PricingError::InvalidSelection(format!("measurement '{label}' not found"))
            })?;
        return Ok(ResolvedPrice {
            price: option.price,
            offer_price: option.offer_price,
            source: PriceSource::Measurement,
        });
    }

    if let Some(name) = selection.color.as_deref() {
        let variants = product.color_variants.as_deref().unwrap_or(&[]);
        let variant = variants
            .iter()
            .find(|c| c.color_name == name)
            .ok_or_else(|| PricingError::InvalidSelection(format!("color '{name}' not found")))?;
        return Ok(ResolvedPrice {
            price: variant.price,
            offer_price: variant.offer_price,
            source: PriceSource::Color,
        });
    }

    match product.base_price {
        Some(price) => Ok(ResolvedPrice {
            price,
            offer_price: product.base_offer_price,
            source: PriceSource::Base,
        }),
        None => Err(PricingError::NoPriceAvailable),
    }
}

/// Cart total: effective unit price times quantity per line, plus the flat
/// shipping fee once for the whole cart.
pub fn cart_total(lines: &[CartLine]) -> i64 {
    if lines.is_empty() {
        return 0;
    }
    lines
        .iter()
        .map(|line| line.effective_price() * line.quantity as i64)
        .sum::<i64>()
        + SHIPPING_FEE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColorVariant, MeasurementOption};
    use chrono::Utc;
    use uuid::Uuid;

    fn product() -> Product {
        Product {
            id: Uuid::new_v4(),
            category: "rugs".into(),
            title: "Handwoven Rug".into(),
            description_points: vec!["Wool".into()],
            images: vec!["/img/rug.png".into()],
            base_price: Some(500),
            base_offer_price: Some(450),
            base_stocks: Some(10),
            measurements: Some(vec![
                MeasurementOption {
                    measurement: "4x6".into(),
                    price: 700,
                    offer_price: Some(650),
                    stocks: Some(5),
                },
                MeasurementOption {
                    measurement: "6x9".into(),
                    price: 900,
                    offer_price: None,
                    stocks: Some(3),
                },
            ]),
            color_variants: Some(vec![ColorVariant {
                color_name: "Indigo".into(),
                color_code: Some("#3f51b5".into()),
                price: 550,
                offer_price: Some(520),
                stocks: Some(4),
            }]),
            enabled: true,
            reviews: vec![],
            created_at: Utc::now(),
        }
    }

    fn select(measurement: Option<&str>, color: Option<&str>) -> Selection {
        Selection {
            measurement: measurement.map(String::from),
            color: color.map(String::from),
        }
    }

    #[test]
    fn measurement_selection_never_falls_back_to_base() {
        let resolved = resolve_price(&product(), &select(Some("4x6"), None)).unwrap();
        assert_eq!(resolved.source, PriceSource::Measurement);
        assert_eq!(resolved.effective(), 650);

        let resolved = resolve_price(&product(), &select(Some("6x9"), None)).unwrap();
        assert_eq!(resolved.offer_price, None);
        assert_eq!(resolved.effective(), 900);
    }

    #[test]
    fn measurement_overrides_color_when_both_supplied() {
        let resolved = resolve_price(&product(), &select(Some("4x6"), Some("Indigo"))).unwrap();
        assert_eq!(resolved.source, PriceSource::Measurement);
        assert_eq!(resolved.effective(), 650);
    }

    #[test]
    fn color_selection_used_when_no_measurement() {
        let resolved = resolve_price(&product(), &select(None, Some("Indigo"))).unwrap();
        assert_eq!(resolved.source, PriceSource::Color);
        assert_eq!(resolved.effective(), 520);
    }

    #[test]
    fn no_selection_falls_back_to_base() {
        let resolved = resolve_price(&product(), &select(None, None)).unwrap();
        assert_eq!(resolved.source, PriceSource::Base);
        assert_eq!(resolved.effective(), 450);
    }

    #[test]
    fn unknown_variant_is_invalid_selection() {
        let err = resolve_price(&product(), &select(Some("9x12"), None)).unwrap_err();
        assert!(matches!(err, PricingError::InvalidSelection(_)));

        let err = resolve_price(&product(), &select(None, Some("Crimson"))).unwrap_err();
        assert!(matches!(err, PricingError::InvalidSelection(_)));
    }

    #[test]
    fn missing_base_price_is_no_price_available() {
        let mut bare = product();
        bare.base_price = None;
        bare.base_offer_price = None;
        let err = resolve_price(&bare, &select(None, None)).unwrap_err();
        assert_eq!(err, PricingError::NoPriceAvailable);
    }

    #[test]
    fn cart_total_adds_shipping_once() {
        let line = |price: i64, offer: Option<i64>, qty: i32| CartLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            title: "x".into(),
            image: None,
            price,
            offer_price: offer,
            selected_measurement: None,
            selected_color: None,
            quantity: qty,
            price_source: PriceSource::Base,
        };

        let lines = vec![line(100, Some(90), 2), line(50, None, 1)];
        assert_eq!(cart_total(&lines), 90 * 2 + 50 + SHIPPING_FEE);
        assert_eq!(cart_total(&[]), 0);
    }
}
