//! Users and roles repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{conflict_on_reference, conflict_on_unique, AppError, AppResult},
    models::user::{Role, RoleName, UpdateUser, User, UserQuery, UserShort},
};

/// Fields of a new account, password already hashed
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub email: Option<&'a str>,
    pub firstname: Option<&'a str>,
    pub lastname: Option<&'a str>,
    pub roles: &'a [RoleName],
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn roles_for(&self, user_id: i64) -> AppResult<Vec<RoleName>> {
        let roles = sqlx::query_scalar::<_, RoleName>(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    /// Get user by ID, roles included
    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        user.roles = self.roles_for(id).await?;
        Ok(user)
    }

    /// Get user by username (case-insensitive), roles included
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(username) = LOWER($1)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match user {
            Some(mut user) => {
                user.roles = self.roles_for(user.id).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Check if a username is taken, optionally ignoring one user
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(username) = LOWER($1) AND ($2::bigint IS NULL OR id != $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        let name = query.name.as_ref().map(|n| format!("%{}%", n));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1 OR firstname ILIKE $1 OR lastname ILIKE $1)
            "#,
        )
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT id, username, firstname, lastname, enabled, locked FROM users
            WHERE ($1::text IS NULL OR username ILIKE $1 OR firstname ILIKE $1 OR lastname ILIKE $1)
            ORDER BY username
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&name)
        .bind(query.per_page())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    /// Insert a user and its roles in one transaction
    pub async fn create(&self, user: NewUser<'_>) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password, email, firstname, lastname)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.email)
        .bind(user.firstname)
        .bind(user.lastname)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Username already exists"))?;

        for role in user.roles {
            sqlx::query(
                "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
            )
            .bind(id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get_by_id(id).await
    }

    /// Update profile fields; unlocking also clears the failed-login counter
    pub async fn update(&self, id: i64, user: &UpdateUser) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                firstname = COALESCE($4, firstname),
                lastname = COALESCE($5, lastname),
                enabled = COALESCE($6, enabled),
                locked = COALESCE($7, locked),
                failed_login_attempts = CASE WHEN $7 = FALSE THEN 0 ELSE failed_login_attempts END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.enabled)
        .bind(user.locked)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Username already exists"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        self.get_by_id(id).await
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count a failed login and lock the account once `max_attempts` is reached.
    /// Returns whether the account is now locked.
    pub async fn record_login_failure(&self, id: i64, max_attempts: i32) -> AppResult<bool> {
        let locked: bool = sqlx::query_scalar(
            r#"
            UPDATE users
            SET failed_login_attempts = failed_login_attempts + 1,
                locked = locked OR failed_login_attempts + 1 >= $2
            WHERE id = $1
            RETURNING locked
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;
        Ok(locked)
    }

    pub async fn reset_login_failures(&self, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET failed_login_attempts = 0 WHERE id = $1 AND failed_login_attempts != 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete a user; borrow history keeps the account from being removed
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_reference(e, "User has borrow history"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn assign_role(&self, user_id: i64, role: RoleName) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, id FROM roles WHERE name = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn revoke_role(&self, user_id: i64, role: RoleName) -> AppResult<()> {
        sqlx::query(
            "DELETE FROM user_roles WHERE user_id = $1 AND role_id = (SELECT id FROM roles WHERE name = $2)",
        )
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
