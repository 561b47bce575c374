use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use validator::Validate;

use crate::models::CreateSupplier;
use crate::startup::AppState;

pub async fn list_suppliers(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let suppliers = state.db.list_suppliers().await?;
    Ok(Json(suppliers))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplier>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let supplier = state.db.create_supplier(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let supplier = state
        .db
        .get_supplier(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Supplier {} not found", id)))?;
    Ok(Json(supplier))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateSupplier>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let supplier = state
        .db
        .update_supplier(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Supplier {} not found", id)))?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_supplier(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Supplier {} not found",
            id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
