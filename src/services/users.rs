//! Authentication and user management service

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use rand::rngs::OsRng;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, LateFee, UserActivity},
        user::{ChangePassword, CreateUser, Role, RoleName, UpdateUser, User, UserClaims, UserQuery, UserShort},
    },
    repository::{users::NewUser, Repository},
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username and password and return a JWT token.
    ///
    /// Failed attempts are counted; the account locks at `max_failed_logins`.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !user.enabled {
            return Err(AppError::Authentication("Account is disabled".to_string()));
        }
        if user.locked {
            return Err(AppError::Authentication("Account is locked".to_string()));
        }

        if !verify_password(&user.password, password)? {
            let locked = self
                .repository
                .users
                .record_login_failure(user.id, self.config.max_failed_logins)
                .await?;
            if locked {
                tracing::warn!(user_id = user.id, "Account locked after repeated login failures");
            } else {
                tracing::info!(user_id = user.id, "Login failure");
            }
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        self.repository.users.reset_login_failures(user.id).await?;
        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            roles: user.roles.clone(),
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<UserShort>, i64)> {
        self.repository.users.search(query).await
    }

    pub async fn is_username_available(&self, username: &str) -> AppResult<bool> {
        Ok(!self.repository.users.username_exists(username, None).await?)
    }

    /// Create a new user; without explicit roles the account is a reader
    pub async fn create_user(&self, user: CreateUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.username_exists(&user.username, None).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }

        let roles = if user.roles.is_empty() {
            vec![RoleName::Reader]
        } else {
            user.roles.clone()
        };
        let password_hash = hash_password(&user.password)?;

        let created = self
            .repository
            .users
            .create(NewUser {
                username: &user.username,
                password_hash: &password_hash,
                email: user.email.as_deref(),
                firstname: user.firstname.as_deref(),
                lastname: user.lastname.as_deref(),
                roles: &roles,
            })
            .await?;

        tracing::info!(user_id = created.id, "User created");
        Ok(created)
    }

    /// Self-registration always yields a plain reader account
    pub async fn register(&self, mut user: CreateUser) -> AppResult<User> {
        user.roles = vec![RoleName::Reader];
        self.create_user(user).await
    }

    /// Update a user. Account flags are reserved to administrators.
    pub async fn update_user(&self, id: i64, user: UpdateUser, by_admin: bool) -> AppResult<User> {
        user.validate()?;

        if !by_admin && (user.enabled.is_some() || user.locked.is_some()) {
            return Err(AppError::Authorization(
                "Only administrators can enable, disable or unlock accounts".to_string(),
            ));
        }

        if let Some(ref username) = user.username {
            if self.repository.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }

        self.repository.users.update(id, &user).await
    }

    /// Create the configured administrator account unless the username is taken.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self) -> AppResult<bool> {
        let Some(ref password) = self.config.admin_password else {
            return Ok(false);
        };
        let username = &self.config.admin_username;
        if self.repository.users.username_exists(username, None).await? {
            return Ok(false);
        }

        let password_hash = hash_password(password)?;
        let created = self
            .repository
            .users
            .create(NewUser {
                username,
                password_hash: &password_hash,
                email: None,
                firstname: None,
                lastname: None,
                roles: &[RoleName::Admin, RoleName::Librarian],
            })
            .await?;
        tracing::warn!(user_id = created.id, username = %created.username, "Administrator account bootstrapped");
        Ok(true)
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn change_password(&self, id: i64, change: ChangePassword) -> AppResult<()> {
        change.validate()?;
        let user = self.repository.users.get_by_id(id).await?;

        if !verify_password(&user.password, &change.old_password)? {
            return Err(AppError::Authentication("Current password is incorrect".to_string()));
        }

        let password_hash = hash_password(&change.new_password)?;
        self.repository.users.update_password(id, &password_hash).await?;
        tracing::info!(user_id = id, "Password changed");
        Ok(())
    }

    /// Delete the caller's own account after re-checking the password
    pub async fn delete_account(&self, id: i64, password: &str) -> AppResult<()> {
        let user = self.repository.users.get_by_id(id).await?;
        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication("Password is incorrect".to_string()));
        }
        self.delete_user(id).await
    }

    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.repository.users.list_roles().await
    }

    pub async fn assign_role(&self, user_id: i64, role: RoleName) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.users.assign_role(user_id, role).await?;
        tracing::info!(user_id, role = %role, "Role assigned");
        self.repository.users.get_by_id(user_id).await
    }

    pub async fn revoke_role(&self, user_id: i64, role: RoleName) -> AppResult<User> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.users.revoke_role(user_id, role).await?;
        tracing::info!(user_id, role = %role, "Role revoked");
        self.repository.users.get_by_id(user_id).await
    }

    pub async fn borrows(&self, user_id: i64) -> AppResult<Vec<Borrow>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.ledgers.user_borrows(user_id).await
    }

    pub async fn activity(&self, user_id: i64) -> AppResult<Vec<UserActivity>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.ledgers.user_activity(user_id).await
    }

    pub async fn late_fees(&self, user_id: i64) -> AppResult<Vec<LateFee>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.ledgers.user_late_fees(user_id).await
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
