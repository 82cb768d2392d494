use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::SubscriptionRepo,
    domain::entities::{billing_event::CheckoutCompleted, subscription::Subscription},
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        subject_id: row.get("user_id"),
        external_customer_id: row.get("stripe_customer_id"),
        external_subscription_id: row.get("stripe_subscription_id"),
        external_price_id: row.get("stripe_price_id"),
        current_period_end: row.get("stripe_current_period_end"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, stripe_customer_id, stripe_subscription_id, stripe_price_id,
    stripe_current_period_end
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_subject_id(&self, subject_id: &str) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscription WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(subject_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn upsert_for_subject(&self, input: &CheckoutCompleted) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO user_subscription (
                id, user_id, stripe_customer_id, stripe_subscription_id,
                stripe_price_id, stripe_current_period_end
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                stripe_price_id = EXCLUDED.stripe_price_id,
                stripe_current_period_end = EXCLUDED.stripe_current_period_end
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.subject_id)
        .bind(&input.external_customer_id)
        .bind(&input.external_subscription_id)
        .bind(&input.external_price_id)
        .bind(input.period_end)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update_billing_period(
        &self,
        external_subscription_id: &str,
        external_price_id: Option<&str>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE user_subscription
            SET stripe_price_id = $2, stripe_current_period_end = $3
            WHERE stripe_subscription_id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(external_subscription_id)
        .bind(external_price_id)
        .bind(period_end)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn delete_by_external_subscription_id(
        &self,
        external_subscription_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "DELETE FROM user_subscription WHERE stripe_subscription_id = $1 RETURNING {}",
            SELECT_COLS
        ))
        .bind(external_subscription_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }
}
