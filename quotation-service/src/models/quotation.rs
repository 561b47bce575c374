//! Quotation aggregate: header, line items, and the client association.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::ClientQuotation;

/// Workflow status carried on the client-quotation association row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationStatus {
    Pending,
    InProcess,
    Completed,
    Cancelled,
    Fulfilling,
}

impl AssociationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssociationStatus::Pending => "pending",
            AssociationStatus::InProcess => "in_process",
            AssociationStatus::Completed => "completed",
            AssociationStatus::Cancelled => "cancelled",
            AssociationStatus::Fulfilling => "fulfilling",
        }
    }
}

/// Quotation header.
///
/// `client_name` is a deliberate snapshot of the client's display name at
/// creation (or last client change); it goes stale when the client is
/// renamed and that is intended.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quotation {
    pub id: i64,
    pub client_name: String,
    pub created_utc: DateTime<Utc>,
    pub total: Decimal,
    pub user_id: i64,
    pub project_id: Option<i64>,
}

/// Quotation line item, read back with the product's display fields joined.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotationDetail {
    pub id: i64,
    pub quotation_id: i64,
    pub product_id: i64,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub variant: Option<String>,
    pub cost_basis: Option<Decimal>,
    pub margin_percent: Option<Decimal>,
    pub margin_amount: Option<Decimal>,
    pub product_name: Option<String>,
    pub product_color: Option<String>,
    pub product_format: Option<String>,
}

/// Full aggregate returned by reads and mutations.
#[derive(Debug, Clone, Serialize)]
pub struct QuotationResponse {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub details: Vec<QuotationDetail>,
    pub project_name: Option<String>,
    pub project_address: Option<String>,
    pub association: Option<ClientQuotation>,
}

/// Input line item for create and for whole-list replacement on update.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuotationDetail {
    pub product_id: i64,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub variant: Option<String>,
    pub cost_basis: Option<Decimal>,
    pub margin_percent: Option<Decimal>,
    pub margin_amount: Option<Decimal>,
}

/// Input for creating a quotation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQuotation {
    pub client_id: i64,
    pub project_id: Option<i64>,
    /// Explicit header total; when absent the total is the sum of line totals.
    pub total: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub shipping_variant: Option<String>,
    pub details: Vec<CreateQuotationDetail>,
}

/// Partial update. A new `client_id` refreshes the name snapshot and clears
/// the project unless `project_id` is supplied in the same call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuotation {
    pub client_id: Option<i64>,
    pub project_id: Option<i64>,
    pub total: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
    pub shipping_variant: Option<String>,
    pub details: Option<Vec<CreateQuotationDetail>>,
}

/// Input for converting a quotation into a sales order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertQuotation {
    /// Target status; defaults to `fulfilling`.
    pub status: Option<AssociationStatus>,
}
