//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod copies;
pub mod ledgers;
pub mod libraries;
#[cfg(test)]
pub mod memory;
pub mod stores;
pub mod transaction;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub libraries: libraries::LibrariesRepository,
    pub copies: copies::CopiesRepository,
    pub users: users::UsersRepository,
    pub ledgers: ledgers::LedgersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            libraries: libraries::LibrariesRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            ledgers: ledgers::LedgersRepository::new(pool.clone()),
            pool,
        }
    }

    /// Unit of work for the borrow workflow, sharing this pool
    pub fn unit_of_work(&self) -> transaction::PgUnitOfWork {
        transaction::PgUnitOfWork::new(self.pool.clone())
    }

    /// Round-trip to the database, used by the readiness check
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
