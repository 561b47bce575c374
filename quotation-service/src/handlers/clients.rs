use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use validator::Validate;

use crate::models::CreateClient;
use crate::startup::AppState;

pub async fn list_clients(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let clients = state.db.list_clients().await?;
    Ok(Json(clients))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClient>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let client = state.db.create_client(&input).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let client = state
        .db
        .get_client(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", id)))?;
    Ok(Json(client))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateClient>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let client = state
        .db
        .update_client(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", id)))?;
    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_client(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Client {} not found",
            id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Projects belonging to one client.
pub async fn list_client_projects(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if state.db.get_client(id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Client {} not found",
            id
        )));
    }
    let projects = state.db.list_projects_for_client(id).await?;
    Ok(Json(projects))
}

/// Full quotation aggregates of one client, converted or not.
pub async fn list_client_quotations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if state.db.get_client(id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Client {} not found",
            id
        )));
    }
    let quotations = state.quotations.list_for_client(id).await?;
    Ok(Json(quotations))
}
