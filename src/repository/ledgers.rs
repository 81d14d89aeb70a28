//! Read access to the borrow, late-fee and activity ledgers

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::borrow::{Borrow, LateFee, UserActivity},
};

#[derive(Clone)]
pub struct LedgersRepository {
    pool: Pool<Postgres>,
}

impl LedgersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn user_borrows(&self, user_id: i64) -> AppResult<Vec<Borrow>> {
        let rows = sqlx::query_as::<_, Borrow>(
            "SELECT * FROM borrows WHERE user_id = $1 ORDER BY date_of_borrow DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn user_activity(&self, user_id: i64) -> AppResult<Vec<UserActivity>> {
        let rows = sqlx::query_as::<_, UserActivity>(
            "SELECT * FROM user_activities WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn user_late_fees(&self, user_id: i64) -> AppResult<Vec<LateFee>> {
        let rows = sqlx::query_as::<_, LateFee>(
            r#"
            SELECT lf.* FROM late_fees lf
            JOIN borrows b ON b.id = lf.borrow_id
            WHERE b.user_id = $1
            ORDER BY lf.date DESC, lf.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
