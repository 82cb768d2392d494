use sqlx::PgPool;

use crate::app_error::AppError;

pub mod principal;
pub mod subscription;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                tracing::debug!(
                    constraint = db_err.constraint().unwrap_or_default(),
                    "Unique constraint violation"
                );
                AppError::UniqueConstraintViolation
            }
            _ => {
                // Details stay in the log; the response only carries the code.
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
