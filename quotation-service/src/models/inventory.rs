//! Inventory model: on-hand stock per product.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub location: Option<String>,
    /// Product name, joined for display.
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInventoryItem {
    pub product_id: i64,
    pub quantity: i32,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInventoryItem {
    pub quantity: Option<i32>,
    pub location: Option<String>,
}
