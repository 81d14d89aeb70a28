//! Library (branch) endpoints

use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::Book,
        library::{Library, LibraryData},
    },
};

use super::AuthenticatedUser;

/// List all libraries
#[utoipa::path(
    get,
    path = "/libraries",
    tag = "libraries",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All libraries", body = Vec<Library>)
    )
)]
pub async fn list_libraries(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Library>>> {
    let libraries = state.services.catalog.list_libraries().await?;
    Ok(Json(libraries))
}

/// Get a library by ID
#[utoipa::path(
    get,
    path = "/libraries/{id}",
    tag = "libraries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Library", body = Library),
        (status = 404, description = "Library not found")
    )
)]
pub async fn get_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Library>> {
    let library = state.services.catalog.get_library(id).await?;
    Ok(Json(library))
}

/// Create a new library
#[utoipa::path(
    post,
    path = "/libraries",
    tag = "libraries",
    security(("bearer_auth" = [])),
    request_body = LibraryData,
    responses(
        (status = 201, description = "Library created", body = Library),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<LibraryData>,
) -> AppResult<(StatusCode, Json<Library>)> {
    claims.require_staff()?;

    let created = state.services.catalog.create_library(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a library
#[utoipa::path(
    put,
    path = "/libraries/{id}",
    tag = "libraries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Library ID")),
    request_body = LibraryData,
    responses(
        (status = 200, description = "Library updated", body = Library),
        (status = 404, description = "Library not found")
    )
)]
pub async fn update_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(data): Json<LibraryData>,
) -> AppResult<Json<Library>> {
    claims.require_staff()?;

    let updated = state.services.catalog.update_library(id, data).await?;
    Ok(Json(updated))
}

/// Update some fields of a library
#[utoipa::path(
    patch,
    path = "/libraries/{id}",
    tag = "libraries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Library ID")),
    request_body(content = HashMap<String, String>, description = "Fields to change: name, address, city, phone"),
    responses(
        (status = 200, description = "Library updated", body = Library),
        (status = 400, description = "Unknown field or empty name"),
        (status = 404, description = "Library not found")
    )
)]
pub async fn patch_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(fields): Json<HashMap<String, String>>,
) -> AppResult<Json<Library>> {
    claims.require_staff()?;

    let updated = state.services.catalog.patch_library(id, fields).await?;
    Ok(Json(updated))
}

/// Delete a library
#[utoipa::path(
    delete,
    path = "/libraries/{id}",
    tag = "libraries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Library ID")),
    responses(
        (status = 204, description = "Library deleted"),
        (status = 404, description = "Library not found"),
        (status = 409, description = "Library still holds copies")
    )
)]
pub async fn delete_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_staff()?;

    state.services.catalog.delete_library(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Books held by a library
#[utoipa::path(
    get,
    path = "/libraries/{id}/books",
    tag = "libraries",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Library ID")),
    responses(
        (status = 200, description = "Books of the library", body = Vec<Book>),
        (status = 404, description = "Library not found")
    )
)]
pub async fn list_library_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<HashSet<Book>>> {
    let books = state.services.catalog.library_books(id).await?;
    Ok(Json(books))
}

/// Add a book to a library's holdings
#[utoipa::path(
    post,
    path = "/libraries/{library_id}/add-book/{book_id}",
    tag = "libraries",
    security(("bearer_auth" = [])),
    params(
        ("library_id" = i64, Path, description = "Library ID"),
        ("book_id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book added", body = Library),
        (status = 404, description = "Library or book not found")
    )
)]
pub async fn add_book_to_library(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((library_id, book_id)): Path<(i64, i64)>,
) -> AppResult<Json<Library>> {
    claims.require_staff()?;

    let library = state
        .services
        .catalog
        .add_book_to_library(library_id, book_id)
        .await?;
    Ok(Json(library))
}
