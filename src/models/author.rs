//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Author from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i64,
    pub firstname: Option<String>,
    pub lastname: String,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    pub firstname: Option<String>,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub lastname: String,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
}

/// Update author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    pub firstname: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    pub lastname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub bio: Option<String>,
}
