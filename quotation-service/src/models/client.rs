//! Client model and the client-quotation association row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A client of the distributor.
///
/// `project` is not a stored column: it is derived on read as the name of
/// the client's principal project (the one with the lowest id), kept for
/// callers that still consume the legacy free-text field.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub discount: Option<Decimal>,
    pub project: Option<String>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating or replacing a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClient {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub address: Option<String>,
    pub discount: Option<Decimal>,
}

/// Join row linking a client to a quotation with a workflow status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientQuotation {
    pub id: i64,
    pub client_id: i64,
    pub quotation_id: i64,
    pub status: String,
}
