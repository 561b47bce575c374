//! Catalog product model with per-unit, per-box and per-m² pricing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub format: Option<String>,
    pub sale_unit: Option<String>,
    pub pieces_per_box: Option<i32>,
    pub piece_weight_kg: Option<Decimal>,
    pub box_weight_kg: Option<Decimal>,
    pub m2_per_box: Option<Decimal>,
    pub price_box_with_vat: Option<Decimal>,
    pub price_box_without_vat: Option<Decimal>,
    pub price_piece_with_vat: Option<Decimal>,
    pub price_piece_without_vat: Option<Decimal>,
    pub price_m2_with_vat: Option<Decimal>,
    pub price_m2_without_vat: Option<Decimal>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub is_external: bool,
    pub supplier_id: Option<i64>,
    pub image_url: Option<String>,
    /// Supplier name, joined for display.
    pub supplier_name: Option<String>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub format: Option<String>,
    pub sale_unit: Option<String>,
    pub pieces_per_box: Option<i32>,
    pub piece_weight_kg: Option<Decimal>,
    pub box_weight_kg: Option<Decimal>,
    pub m2_per_box: Option<Decimal>,
    pub price_box_with_vat: Option<Decimal>,
    pub price_box_without_vat: Option<Decimal>,
    pub price_piece_with_vat: Option<Decimal>,
    pub price_piece_without_vat: Option<Decimal>,
    pub price_m2_with_vat: Option<Decimal>,
    pub price_m2_without_vat: Option<Decimal>,
    pub color: Option<String>,
    pub material: Option<String>,
    #[serde(default)]
    pub is_external: bool,
    pub supplier_id: Option<i64>,
    pub image_url: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProduct {
    pub code: Option<String>,
    pub name: Option<String>,
    pub format: Option<String>,
    pub sale_unit: Option<String>,
    pub pieces_per_box: Option<i32>,
    pub piece_weight_kg: Option<Decimal>,
    pub box_weight_kg: Option<Decimal>,
    pub m2_per_box: Option<Decimal>,
    pub price_box_with_vat: Option<Decimal>,
    pub price_box_without_vat: Option<Decimal>,
    pub price_piece_with_vat: Option<Decimal>,
    pub price_piece_without_vat: Option<Decimal>,
    pub price_m2_with_vat: Option<Decimal>,
    pub price_m2_without_vat: Option<Decimal>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub is_external: Option<bool>,
    pub supplier_id: Option<i64>,
    pub image_url: Option<String>,
}
