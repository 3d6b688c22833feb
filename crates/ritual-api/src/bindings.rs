use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use ritual_db::queries::BindingUpsert;
use ritual_types::api::BindingRequest;

use crate::AppState;
use crate::error::ApiError;

/// Called by the reminder bot once a user completes the linking handshake.
/// Idempotent per user; refuses a chat id already held by someone else.
pub async fn upsert_binding(
    State(state): State<AppState>,
    Json(req): Json<BindingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state
        .db
        .upsert_binding(req.user_id, &req.chat_id, req.handle.as_deref())?
    {
        BindingUpsert::Linked(binding) => Ok(Json(binding)),
        BindingUpsert::ChatTaken => Err(ApiError::ChatTaken),
    }
}

pub async fn get_binding(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let binding = state
        .db
        .binding_for_user(user_id)?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(binding))
}
