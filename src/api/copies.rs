//! Copy endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::copy::{Copy, CopyAvailability, CreateCopy},
};

use super::AuthenticatedUser;

/// Get a copy by ID
#[utoipa::path(
    get,
    path = "/copies/{id}",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Copy", body = Copy),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Copy>> {
    let copy = state.services.catalog.get_copy(id).await?;
    Ok(Json(copy))
}

/// Register a new physical copy
#[utoipa::path(
    post,
    path = "/copies",
    tag = "copies",
    security(("bearer_auth" = [])),
    request_body = CreateCopy,
    responses(
        (status = 201, description = "Copy created", body = Copy),
        (status = 404, description = "Book or library not found"),
        (status = 409, description = "Copy number already exists")
    )
)]
pub async fn create_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(copy): Json<CreateCopy>,
) -> AppResult<(StatusCode, Json<Copy>)> {
    claims.require_staff()?;

    let created = state.services.catalog.create_copy(copy).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a copy (admin only)
#[utoipa::path(
    delete,
    path = "/copies/{id}",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Copy ID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy has borrow history")
    )
)]
pub async fn delete_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_copy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Whether a copy can be borrowed today
#[utoipa::path(
    get,
    path = "/copies/{id}/availability",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Availability of the copy", body = CopyAvailability),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn copy_availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<CopyAvailability>> {
    let copy = state.services.catalog.get_copy(id).await?;
    let available = state.services.borrows.is_copy_available(copy.id).await?;
    Ok(Json(CopyAvailability {
        copy_id: copy.id,
        available,
    }))
}
