// src/db/calendar_repo.rs

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::calendar::{BlockedDate, DeliverySlot},
};

#[derive(Clone)]
pub struct CalendarRepository {
    pool: PgPool,
}

impl CalendarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active_slots(&self) -> Result<Vec<DeliverySlot>, AppError> {
        let slots = sqlx::query_as::<_, DeliverySlot>(
            "SELECT * FROM delivery_slots WHERE is_active = TRUE ORDER BY start_time ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    pub async fn get_slot(&self, id: i32) -> Result<Option<DeliverySlot>, AppError> {
        let slot = sqlx::query_as::<_, DeliverySlot>("SELECT * FROM delivery_slots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(slot)
    }

    pub async fn list_blocked_dates(&self) -> Result<Vec<BlockedDate>, AppError> {
        let dates = sqlx::query_as::<_, BlockedDate>(
            "SELECT * FROM blocked_dates ORDER BY date ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    pub async fn create_blocked_date(
        &self,
        date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<BlockedDate, AppError> {
        let blocked = sqlx::query_as::<_, BlockedDate>(
            "INSERT INTO blocked_dates (date, reason) VALUES ($1, $2) RETURNING *",
        )
        .bind(date)
        .bind(reason)
        .fetch_one(&self.pool)
        .await?;
        Ok(blocked)
    }

    pub async fn delete_blocked_date(&self, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM blocked_dates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::BlockedDateNotFound);
        }
        Ok(())
    }
}
