//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, LateFee, UserActivity},
        user::{
            AssignRole, ChangePassword, CreateUser, DeleteAccount, Role, RoleName, UpdateUser, User,
            UserQuery, UserShort, UsernameQuery,
        },
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List users with search and pagination
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "List of users", body = PaginatedResponse<UserShort>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an administrator")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<PaginatedResponse<UserShort>>> {
    claims.require_admin()?;

    let (users, total) = state.services.users.search_users(&query).await?;

    Ok(Json(PaginatedResponse {
        items: users,
        total,
        page: query.page(),
        per_page: query.per_page(),
    }))
}

/// Get user details by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    claims.require_admin_or_self(id)?;

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Create a user account with explicit roles
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_admin()?;

    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn update_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(user): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    claims.require_admin_or_self(id)?;

    let updated = state
        .services
        .users
        .update_user(id, user, claims.is_admin())
        .await?;
    Ok(Json(updated))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has borrow history")
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check whether a username is still free
#[utoipa::path(
    get,
    path = "/users/check-username",
    tag = "users",
    params(UsernameQuery),
    responses(
        (status = 204, description = "Username is available"),
        (status = 409, description = "Username is taken")
    )
)]
pub async fn check_username(
    State(state): State<crate::AppState>,
    Query(query): Query<UsernameQuery>,
) -> AppResult<StatusCode> {
    if state.services.users.is_username_available(&query.username).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Conflict("Username already exists".to_string()))
    }
}

/// Change one's own password
#[utoipa::path(
    put,
    path = "/users/{id}/password",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password is incorrect"),
        (status = 403, description = "Not your account")
    )
)]
pub async fn change_password(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(change): Json<ChangePassword>,
) -> AppResult<StatusCode> {
    claims.require_self(id)?;

    state.services.users.change_password(id, change).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete one's own account
#[utoipa::path(
    delete,
    path = "/users/{id}/account",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = DeleteAccount,
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Password is incorrect"),
        (status = 403, description = "Not your account")
    )
)]
pub async fn delete_account(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<DeleteAccount>,
) -> AppResult<StatusCode> {
    claims.require_self(id)?;

    state.services.users.delete_account(id, &request.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the known roles
#[utoipa::path(
    get,
    path = "/roles",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All roles", body = Vec<Role>)
    )
)]
pub async fn list_roles(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Role>>> {
    let roles = state.services.users.list_roles().await?;
    Ok(Json(roles))
}

/// Grant a role to a user
#[utoipa::path(
    post,
    path = "/users/{id}/roles",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = AssignRole,
    responses(
        (status = 200, description = "Role granted", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn assign_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(request): Json<AssignRole>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.assign_role(id, request.role).await?;
    Ok(Json(user))
}

/// Revoke a role from a user
#[utoipa::path(
    delete,
    path = "/users/{id}/roles/{role}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "User ID"),
        ("role" = RoleName, Path, description = "Role name")
    ),
    responses(
        (status = 200, description = "Role revoked", body = User),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn revoke_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, role)): Path<(i64, RoleName)>,
) -> AppResult<Json<User>> {
    claims.require_admin()?;

    let user = state.services.users.revoke_role(id, role).await?;
    Ok(Json(user))
}

/// Borrow records of a user
#[utoipa::path(
    get,
    path = "/users/{id}/borrows",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Borrow records, newest first", body = Vec<Borrow>),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<Borrow>>> {
    claims.require_staff_or_self(id)?;

    let borrows = state.services.users.borrows(id).await?;
    Ok(Json(borrows))
}

/// Activity log of a user
#[utoipa::path(
    get,
    path = "/users/{id}/activity",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Activity entries, newest first", body = Vec<UserActivity>),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_activity(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<UserActivity>>> {
    claims.require_staff_or_self(id)?;

    let activity = state.services.users.activity(id).await?;
    Ok(Json(activity))
}

/// Late fees charged to a user
#[utoipa::path(
    get,
    path = "/users/{id}/late-fees",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Late fees", body = Vec<LateFee>),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_late_fees(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<LateFee>>> {
    claims.require_staff_or_self(id)?;

    let fees = state.services.users.late_fees(id).await?;
    Ok(Json(fees))
}
