use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;

use crate::startup::AppState;

pub async fn list_sales_orders(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.db.list_sales_orders().await?;
    Ok(Json(orders))
}

pub async fn get_sales_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .db
        .get_sales_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Sales order {} not found", id)))?;
    Ok(Json(order))
}
