use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;

use crate::middleware::UserId;
use crate::models::{ConvertQuotation, CreateQuotation, UpdateQuotation};
use crate::services::metrics::ERRORS_TOTAL;
use crate::startup::AppState;

pub async fn create_quotation(
    State(state): State<AppState>,
    user_id: UserId,
    Json(input): Json<CreateQuotation>,
) -> Result<impl IntoResponse, AppError> {
    let quotation = state
        .quotations
        .create(input, user_id.0)
        .await
        .map_err(track)?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

/// Open quotations only; converted ones are listed under sales orders.
pub async fn list_quotations(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let quotations = state.quotations.list_open().await.map_err(track)?;
    Ok(Json(quotations))
}

pub async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quotation = state.quotations.get(id).await.map_err(track)?;
    Ok(Json(quotation))
}

pub async fn update_quotation(
    State(state): State<AppState>,
    _user_id: UserId,
    Path(id): Path<i64>,
    Json(input): Json<UpdateQuotation>,
) -> Result<impl IntoResponse, AppError> {
    let quotation = state.quotations.update(id, input).await.map_err(track)?;
    Ok(Json(quotation))
}

/// Legacy alias for deletion kept for the deployed frontend.
pub async fn cancel_quotation(
    State(state): State<AppState>,
    _user_id: UserId,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.quotations.delete(id).await.map_err(track)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn convert_quotation(
    State(state): State<AppState>,
    _user_id: UserId,
    Path(id): Path<i64>,
    input: Option<Json<ConvertQuotation>>,
) -> Result<impl IntoResponse, AppError> {
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let order = state.quotations.convert(id, input).await.map_err(track)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn delete_quotation(
    State(state): State<AppState>,
    _user_id: UserId,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.quotations.delete(id).await.map_err(track)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn quotation_pdf(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.quotations.quotation_pdf(id).await.map_err(track)?;
    Ok(pdf_response(format!("Cotizacion_{}.pdf", id), bytes))
}

pub async fn delivery_note_pdf(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state
        .quotations
        .delivery_note_pdf(id)
        .await
        .map_err(track)?;
    Ok(pdf_response(format!("NotaRemision_{}.pdf", id), bytes))
}

fn track(error: AppError) -> AppError {
    ERRORS_TOTAL
        .with_label_values(&[error.error_type()])
        .inc();
    error
}

fn pdf_response(filename: String, bytes: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
}
