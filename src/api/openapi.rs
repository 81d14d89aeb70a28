//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, borrows, copies, health, libraries, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "0.3.0",
        description = "Library borrowing REST API: catalog, copies, borrow and return with late fees"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::register,
        auth::me,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_book_copies,
        // Libraries
        libraries::list_libraries,
        libraries::get_library,
        libraries::create_library,
        libraries::update_library,
        libraries::patch_library,
        libraries::delete_library,
        libraries::list_library_books,
        libraries::add_book_to_library,
        // Copies
        copies::get_copy,
        copies::create_copy,
        copies::delete_copy,
        copies::copy_availability,
        // Borrows
        borrows::borrow_copy,
        borrows::return_copy,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::check_username,
        users::change_password,
        users::delete_account,
        users::list_roles,
        users::assign_role,
        users::revoke_role,
        users::user_borrows,
        users::user_activity,
        users::user_late_fees,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Catalog
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::book::Book,
            crate::models::book::BookQuery,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::library::Library,
            crate::models::library::LibraryData,
            crate::models::copy::Copy,
            crate::models::copy::CreateCopy,
            crate::models::copy::CopyAvailability,
            // Ledgers
            crate::models::borrow::Borrow,
            crate::models::borrow::LateFee,
            crate::models::borrow::ActivityType,
            crate::models::borrow::UserActivity,
            // Users
            crate::models::user::RoleName,
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::UserQuery,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::ChangePassword,
            crate::models::user::DeleteAccount,
            crate::models::user::AssignRole,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "authors", description = "Authors of the catalog"),
        (name = "books", description = "Book titles"),
        (name = "libraries", description = "Library branches and their holdings"),
        (name = "copies", description = "Physical copies"),
        (name = "borrows", description = "Borrow and return workflow"),
        (name = "users", description = "User and role management")
    )
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
