use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::desk::DeskError;
use crate::guard::GuardError;
use crate::notice::Notice;
use crate::record::TableError;

/// Failure of an HTTP action
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Desk(#[from] DeskError),
    #[error("{0}")]
    Internal(String),
}

/// Body of every error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub notices: Vec<Notice>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Desk(DeskError::Guard(GuardError::Occupied)) => StatusCode::CONFLICT,
            AppError::Desk(DeskError::Guard(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Desk(DeskError::Table(TableError::NotFound(_))) => StatusCode::NOT_FOUND,
            AppError::Desk(DeskError::Table(TableError::DuplicateBarcode(_))) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Desk(DeskError::NoPendingBarcode) => StatusCode::BAD_REQUEST,
            AppError::Desk(DeskError::Barcode(_)) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AppError::Desk(e) => e.user_message(),
            AppError::Internal(msg) => format!("Internal error: {}", msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::info!("action rejected: {}", self);
        }

        let body = ErrorResponse {
            status: "error",
            notices: vec![Notice::error(self.user_message())],
        };

        (status, Json(body)).into_response()
    }
}
