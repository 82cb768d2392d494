use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The variant is logged; the response never says which auth check failed.
        if self.is_auth_failure() {
            tracing::info!(error = ?self, "Authentication failed");
            return error_resp(StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, None);
        }

        match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = ?self, "Request failed")
            }
            _ => tracing::warn!(error = ?self, "Request rejected"),
        }

        let code = self.code();
        match self {
            AppError::UniqueConstraintViolation | AppError::EventOutOfOrder => {
                error_resp(StatusCode::CONFLICT, code, None)
            }
            AppError::SignatureInvalid => error_resp(StatusCode::BAD_REQUEST, code, None),
            AppError::Forbidden => error_resp(StatusCode::FORBIDDEN, code, None),
            AppError::InvalidInput(msg) => error_resp(StatusCode::BAD_REQUEST, code, Some(msg)),
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, code, None),
            _ => error_resp(StatusCode::INTERNAL_SERVER_ERROR, code, None),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
