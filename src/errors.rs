use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{eligibility::IneligibilityReason, matching::NoMatchReason, store::StoreError};

/// Everything a handler can fail with, mapped onto a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("quantity must be > 0")]
    ZeroQuantity,
    #[error("{0}")]
    BadSymbol(String),
    #[error("order not found")]
    OrderNotFound,
    #[error("orders do not match: {0}")]
    NoMatch(NoMatchReason),
    #[error("{0}")]
    Ineligible(IneligibilityReason),
    #[error("order already completed")]
    AlreadyCompleted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::ZeroQuantity => StatusCode::BAD_REQUEST,
            ApiError::BadSymbol(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::OrderNotFound => StatusCode::NOT_FOUND,
            ApiError::NoMatch(_) | ApiError::Ineligible(_) | ApiError::AlreadyCompleted => {
                StatusCode::CONFLICT
            }
            ApiError::Store(StoreError::BadCursor) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
