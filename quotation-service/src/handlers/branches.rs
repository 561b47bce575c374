use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use validator::Validate;

use crate::models::CreateBranch;
use crate::startup::AppState;

pub async fn list_branches(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let branches = state.db.list_branches().await?;
    Ok(Json(branches))
}

pub async fn create_branch(
    State(state): State<AppState>,
    Json(input): Json<CreateBranch>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let branch = state.db.create_branch(&input).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let branch = state
        .db
        .get_branch(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch {} not found", id)))?;
    Ok(Json(branch))
}

pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CreateBranch>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let branch = state
        .db
        .update_branch(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Branch {} not found", id)))?;
    Ok(Json(branch))
}

pub async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_branch(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Branch {} not found",
            id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
