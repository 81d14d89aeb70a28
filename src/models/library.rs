//! Library (branch) model and related types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Library from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

/// Create or replace library request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LibraryData {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

/// Partial library update built from a `{ field: value }` map
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LibraryPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

impl LibraryPatch {
    /// Build a patch, rejecting unknown field names and an empty name
    pub fn from_fields(fields: HashMap<String, String>) -> AppResult<Self> {
        let mut patch = LibraryPatch::default();
        for (field, value) in fields {
            match field.as_str() {
                "name" => {
                    if value.trim().is_empty() {
                        return Err(AppError::Validation("Name cannot be empty".to_string()));
                    }
                    patch.name = Some(value);
                }
                "address" => patch.address = Some(value),
                "city" => patch.city = Some(value),
                "phone" => patch.phone = Some(value),
                other => {
                    return Err(AppError::Validation(format!(
                        "Unknown library field: {}",
                        other
                    )))
                }
            }
        }
        Ok(patch)
    }

    pub fn apply(self, library: &mut Library) {
        if let Some(name) = self.name {
            library.name = name;
        }
        if let Some(address) = self.address {
            library.address = Some(address);
        }
        if let Some(city) = self.city {
            library.city = Some(city);
        }
        if let Some(phone) = self.phone {
            library.phone = Some(phone);
        }
    }
}
