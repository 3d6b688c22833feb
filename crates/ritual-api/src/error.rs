use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use ritual_types::validate::Violations;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Business-rule violations, surfaced field-keyed to the caller.
    #[error("validation failed")]
    Validation(Violations),

    #[error("not found")]
    NotFound,

    #[error("chat id already linked to another user")]
    ChatTaken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "errors": violations })),
            )
                .into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::ChatTaken => (
                StatusCode::CONFLICT,
                Json(serde_json::json!({
                    "error": "chat id already linked to another user"
                })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!("internal error: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
