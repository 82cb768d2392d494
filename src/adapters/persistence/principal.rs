use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::identity::PrincipalRepo,
    domain::entities::principal::Principal,
};

fn row_to_principal(row: &sqlx::postgres::PgRow) -> Principal {
    Principal {
        subject_id: row.get("id"),
        email: row.get("email"),
        locally_provisioned: row.get("locally_provisioned"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl PrincipalRepo for PostgresPersistence {
    async fn find_by_subject_id(&self, subject_id: &str) -> AppResult<Option<Principal>> {
        let row = sqlx::query(
            "SELECT id, email, locally_provisioned, created_at FROM users WHERE id = $1",
        )
        .bind(subject_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_principal))
    }

    async fn insert(&self, principal: &Principal) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, locally_provisioned, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&principal.subject_id)
        .bind(&principal.email)
        .bind(principal.locally_provisioned)
        .bind(
            principal
                .created_at
                .unwrap_or_else(|| Utc::now().naive_utc()),
        )
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    async fn delete_by_id(&self, subject_id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(subject_id)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
