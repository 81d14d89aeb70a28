//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::error::AppResult;

use super::AuthenticatedUser;

/// Lend a copy to a user
#[utoipa::path(
    post,
    path = "/borrow/{copy_id}/{user_id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("copy_id" = i64, Path, description = "Copy ID"),
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Copy borrowed"),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Copy or user not found"),
        (status = 409, description = "Copy is not available")
    )
)]
pub async fn borrow_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((copy_id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.borrows.borrow_copy(copy_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Take a copy back from a user, charging a late fee when overdue
#[utoipa::path(
    post,
    path = "/return/{copy_id}/{user_id}",
    tag = "borrows",
    security(("bearer_auth" = [])),
    params(
        ("copy_id" = i64, Path, description = "Copy ID"),
        ("user_id" = i64, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "Copy returned"),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "Copy or user not found")
    )
)]
pub async fn return_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((copy_id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    let receipt = state.services.borrows.return_copy(copy_id, user_id).await?;
    if let Some(fee) = receipt.late_fee {
        tracing::debug!(copy_id, user_id, amount = %fee.amount, "Return charged a late fee");
    }
    Ok(StatusCode::NO_CONTENT)
}
