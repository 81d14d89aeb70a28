//! Postgres unit of work backing the borrow workflow

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use super::stores::{ActivityLog, BorrowLedger, BorrowUnit, CopyStore, LateFeeLedger, UnitOfWork, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, LateFee, NewBorrow, NewLateFee, NewUserActivity, UserActivity},
        copy::Copy,
        user::{RoleName, User},
    },
};

#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: Pool<Postgres>,
}

impl PgUnitOfWork {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Unit = PgBorrowUnit;

    async fn begin(&self) -> AppResult<PgBorrowUnit> {
        let tx = self.pool.begin().await?;
        Ok(PgBorrowUnit { tx })
    }
}

/// One open transaction; sqlx rolls it back when dropped uncommitted
pub struct PgBorrowUnit {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CopyStore for PgBorrowUnit {
    async fn peek_copy(&mut self, id: i64) -> AppResult<Option<Copy>> {
        let copy = sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(copy)
    }

    async fn find_copy(&mut self, id: i64) -> AppResult<Option<Copy>> {
        // Row lock so concurrent borrows of the same copy serialize
        let copy = sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(copy)
    }

    async fn save_copy(&mut self, copy: Copy) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>(
            r#"
            UPDATE copies
            SET copy_number = $2, purchase_date = $3, borrowed_date = $4,
                expected_return_date = $5, return_date = $6, book_id = $7, library_id = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(copy.id)
        .bind(copy.copy_number)
        .bind(copy.purchase_date)
        .bind(copy.borrowed_date)
        .bind(copy.expected_return_date)
        .bind(copy.return_date)
        .bind(copy.book_id)
        .bind(copy.library_id)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", copy.id)))
    }
}

#[async_trait]
impl UserStore for PgBorrowUnit {
    async fn find_user(&mut self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        let Some(mut user) = user else {
            return Ok(None);
        };

        user.roles = sqlx::query_scalar::<_, RoleName>(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(user))
    }
}

#[async_trait]
impl BorrowLedger for PgBorrowUnit {
    async fn save_borrow(&mut self, borrow: NewBorrow) -> AppResult<Borrow> {
        let row = sqlx::query_as::<_, Borrow>(
            r#"
            INSERT INTO borrows (copy_id, user_id, date_of_borrow, expected_return_date, return_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(borrow.copy_id)
        .bind(borrow.user_id)
        .bind(borrow.date_of_borrow)
        .bind(borrow.expected_return_date)
        .bind(borrow.return_date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl LateFeeLedger for PgBorrowUnit {
    async fn save_late_fee(&mut self, fee: NewLateFee) -> AppResult<LateFee> {
        let row = sqlx::query_as::<_, LateFee>(
            "INSERT INTO late_fees (borrow_id, amount, date) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(fee.borrow_id)
        .bind(fee.amount)
        .bind(fee.date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl ActivityLog for PgBorrowUnit {
    async fn save_activity(&mut self, activity: NewUserActivity) -> AppResult<UserActivity> {
        let row = sqlx::query_as::<_, UserActivity>(
            r#"
            INSERT INTO user_activities (user_id, copy_id, action_type, borrow_date, return_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(activity.user_id)
        .bind(activity.copy_id)
        .bind(activity.action_type)
        .bind(activity.borrow_date)
        .bind(activity.return_date)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl BorrowUnit for PgBorrowUnit {
    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
