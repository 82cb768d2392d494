use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authorization header must be 'Bearer <token>'")]
    MalformedCredential,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("User not found")]
    UserNotFound,

    #[error("Unique constraint violation")]
    UniqueConstraintViolation,

    #[error("Invalid webhook signature")]
    SignatureInvalid,

    #[error("Event arrived before the record it refers to")]
    EventOutOfOrder,

    #[error("Forbidden")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors that must reach the caller as a plain 401, whatever the cause.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppError::MalformedCredential
                | AppError::TokenExpired
                | AppError::InvalidToken
                | AppError::Unauthenticated
                | AppError::UserNotFound
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            e if e.is_auth_failure() => ErrorCode::Unauthorized,
            AppError::UniqueConstraintViolation => ErrorCode::Conflict,
            AppError::SignatureInvalid => ErrorCode::InvalidSignature,
            AppError::EventOutOfOrder => ErrorCode::EventOutOfOrder,
            AppError::Forbidden => ErrorCode::Forbidden,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::DatabaseError,
            _ => ErrorCode::InternalError,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthorized,
    Conflict,
    InvalidSignature,
    EventOutOfOrder,
    Forbidden,
    InvalidInput,
    NotFound,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::EventOutOfOrder => "EVENT_OUT_OF_ORDER",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
