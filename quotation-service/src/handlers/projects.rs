use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use validator::Validate;

use crate::models::{CreateProject, ReassignProject, UpdateProject};
use crate::startup::AppState;

pub async fn list_projects(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let projects = state.db.list_projects().await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;
    let project = state.db.create_project(&input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .db
        .get_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project {} not found", id)))?;
    Ok(Json(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateProject>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .db
        .update_project(id, &input)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project {} not found", id)))?;
    Ok(Json(project))
}

/// Move a project to a different client.
pub async fn reassign_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ReassignProject>,
) -> Result<impl IntoResponse, AppError> {
    let project = state
        .db
        .reassign_project(id, input.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project {} not found", id)))?;
    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_project(id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Project {} not found",
            id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
