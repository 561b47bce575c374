//! Sales order: a point-in-time snapshot of an accepted quotation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalesOrder {
    pub id: i64,
    pub quotation_id: i64,
    pub client_name: String,
    pub created_utc: DateTime<Utc>,
    pub total: Decimal,
    pub user_id: i64,
    pub project_id: Option<i64>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SalesOrderDetail {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesOrderResponse {
    #[serde(flatten)]
    pub order: SalesOrder,
    pub details: Vec<SalesOrderDetail>,
}
