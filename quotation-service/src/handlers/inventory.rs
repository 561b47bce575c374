use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;

use crate::models::{CreateInventoryItem, UpdateInventoryItem};
use crate::startup::AppState;

pub async fn list_inventory(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let items = state.db.list_inventory().await?;
    Ok(Json(items))
}

pub async fn create_inventory_item(
    State(state): State<AppState>,
    Json(input): Json<CreateInventoryItem>,
) -> Result<impl IntoResponse, AppError> {
    let item = state.db.create_inventory_item(&input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .db
        .get_inventory_item(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Inventory item {} not found", id)))?;
    Ok(Json(item))
}

pub async fn update_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateInventoryItem>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .db
        .update_inventory_item(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Inventory item {} not found", id)))?;
    Ok(Json(item))
}

pub async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_inventory_item(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Inventory item {} not found",
            id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
