use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
}

/// Which pricing path produced a cart line's frozen price.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    #[default]
    Base,
    Measurement,
    Color,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Base => "base",
            PriceSource::Measurement => "measurement",
            PriceSource::Color => "color",
        }
    }

    /// Lenient parse for stored tags; unknown values fall back to base.
    pub fn parse(s: &str) -> Self {
        match s {
            "measurement" => PriceSource::Measurement,
            "color" => PriceSource::Color,
            _ => PriceSource::Base,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementOption {
    pub measurement: String,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub stocks: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct ColorVariant {
    pub color_name: String,
    pub color_code: Option<String>,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub stocks: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
pub struct Review {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
}

// JSONB column wrappers for the product entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct DescriptionPoints(pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Images(pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Measurements(pub Vec<MeasurementOption>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ColorVariants(pub Vec<ColorVariant>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Reviews(pub Vec<Review>);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub category: String,
    pub title: String,
    pub description_points: Vec<String>,
    pub images: Vec<String>,
    pub base_price: Option<i64>,
    pub base_offer_price: Option<i64>,
    pub base_stocks: Option<i32>,
    pub measurements: Option<Vec<MeasurementOption>>,
    pub color_variants: Option<Vec<ColorVariant>>,
    pub enabled: bool,
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
}

/// One line of a cart. Title, image and price are frozen at add time; the
/// selections are reduced to their identifying markers (measurement label,
/// color name) which together with the product id form the matching key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub selected_measurement: Option<String>,
    pub selected_color: Option<String>,
    pub quantity: i32,
    #[serde(default)]
    pub price_source: PriceSource,
}

impl CartLine {
    pub fn effective_price(&self) -> i64 {
        self.offer_price.unwrap_or(self.price)
    }

    /// Product id plus both reduced selection markers must agree for two
    /// lines to be considered the same purchasable unit.
    pub fn matches(
        &self,
        product_id: Uuid,
        measurement: &Option<String>,
        color: &Option<String>,
    ) -> bool {
        self.product_id == product_id
            && self.selected_measurement == *measurement
            && self.selected_color == *color
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
pub struct CartLines(pub Vec<CartLine>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub zip_code: String,
    pub country: String,
}

impl Address {
    /// Checkout requires every field except `state`.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.full_name.trim().is_empty() {
            return Some("fullName");
        }
        if self.phone.trim().is_empty() {
            return Some("phone");
        }
        if self.email.trim().is_empty() {
            return Some("email");
        }
        if self.address.trim().is_empty() {
            return Some("address");
        }
        if self.city.trim().is_empty() {
            return Some("city");
        }
        if self.zip_code.trim().is_empty() {
            return Some("zipCode");
        }
        if self.country.trim().is_empty() {
            return Some("country");
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub method: String,
    pub transaction_id: String,
    pub status: String,
    pub amount: i64,
    pub gateway: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    /// A user may cancel as long as the order has not left the warehouse.
    pub fn user_cancellable(&self) -> bool {
        !matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            "Failed" => Ok(OrderStatus::Failed),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub billing_address: Address,
    pub delivery_address: Address,
    pub payment: Option<PaymentRecord>,
    pub order_notes: String,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub selected_measurement: Option<String>,
    pub selected_color: Option<String>,
    pub quantity: i32,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub price_source: PriceSource,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("paid".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn shipped_and_delivered_are_not_cancellable() {
        assert!(OrderStatus::Pending.user_cancellable());
        assert!(OrderStatus::Processing.user_cancellable());
        assert!(!OrderStatus::Shipped.user_cancellable());
        assert!(!OrderStatus::Delivered.user_cancellable());
        assert!(OrderStatus::Cancelled.user_cancellable());
        assert!(OrderStatus::Failed.user_cancellable());
    }

    #[test]
    fn line_matching_requires_both_markers() {
        let product_id = Uuid::new_v4();
        let line = CartLine {
            id: Uuid::new_v4(),
            product_id,
            title: "Rug".into(),
            image: None,
            price: 100,
            offer_price: Some(90),
            selected_measurement: Some("4x6".into()),
            selected_color: None,
            quantity: 1,
            price_source: PriceSource::Measurement,
        };

        assert!(line.matches(product_id, &Some("4x6".into()), &None));
        assert!(!line.matches(product_id, &Some("6x9".into()), &None));
        assert!(!line.matches(product_id, &Some("4x6".into()), &Some("Red".into())));
        assert!(!line.matches(Uuid::new_v4(), &Some("4x6".into()), &None));
    }

    #[test]
    fn effective_price_prefers_offer() {
        let mut line = CartLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            title: "Rug".into(),
            image: None,
            price: 100,
            offer_price: Some(90),
            selected_measurement: None,
            selected_color: None,
            quantity: 1,
            price_source: PriceSource::Base,
        };
        assert_eq!(line.effective_price(), 90);
        line.offer_price = None;
        assert_eq!(line.effective_price(), 100);
    }
}
