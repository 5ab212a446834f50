use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{ColorVariant, MeasurementOption, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub category: String,
    pub title: String,
    pub description_points: Vec<String>,
    pub images: Vec<String>,
    pub base_price: Option<i64>,
    pub base_offer_price: Option<i64>,
    pub base_stocks: Option<i32>,
    pub measurements: Option<Vec<MeasurementOption>>,
    pub color_variants: Option<Vec<ColorVariant>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub category: Option<String>,
    pub title: Option<String>,
    pub description_points: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub base_price: Option<Option<i64>>,
    pub base_offer_price: Option<Option<i64>>,
    pub base_stocks: Option<Option<i32>>,
    pub measurements: Option<Option<Vec<MeasurementOption>>>,
    pub color_variants: Option<Option<Vec<ColorVariant>>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddReviewRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
