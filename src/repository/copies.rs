//! Copies repository for catalog operations
//!
//! Borrow and return go through the unit of work in `transaction.rs`.

use sqlx::{Pool, Postgres};

use crate::{
    error::{conflict_on_reference, conflict_on_unique, AppError, AppResult},
    models::copy::{Copy, CreateCopy},
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    pub async fn list_for_book(&self, book_id: i64) -> AppResult<Vec<Copy>> {
        let copies = sqlx::query_as::<_, Copy>(
            "SELECT * FROM copies WHERE book_id = $1 ORDER BY copy_number",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    pub async fn create(&self, copy: &CreateCopy) -> AppResult<Copy> {
        sqlx::query_as::<_, Copy>(
            r#"
            INSERT INTO copies (copy_number, purchase_date, book_id, library_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(copy.copy_number)
        .bind(copy.purchase_date)
        .bind(copy.book_id)
        .bind(copy.library_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Copy number already in use"))
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM copies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_reference(e, "Copy has borrow history"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Copy with id {} not found", id)));
        }
        Ok(())
    }
}
