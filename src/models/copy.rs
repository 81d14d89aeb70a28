//! Copy (physical unit of a book) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Copy from database
///
/// `borrowed_date` is null for a copy that was never lent. `return_date` is the
/// date the copy came (or is considered to come) back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Copy {
    pub id: i64,
    pub copy_number: i32,
    pub purchase_date: NaiveDate,
    pub borrowed_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub book_id: Option<i64>,
    pub library_id: Option<i64>,
}

impl Copy {
    /// Availability of the copy on `today`.
    ///
    /// A copy whose return date is strictly in the past counts as available even
    /// if no return was ever recorded for it.
    pub fn is_available_on(&self, today: NaiveDate) -> bool {
        match (self.borrowed_date, self.return_date) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(returned)) => returned < today,
        }
    }
}

/// Create copy request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCopy {
    #[validate(range(min = 1, message = "Copy number must be positive"))]
    pub copy_number: i32,
    pub purchase_date: NaiveDate,
    pub book_id: Option<i64>,
    pub library_id: Option<i64>,
}

/// Availability answer for a single copy
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CopyAvailability {
    pub copy_id: i64,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn copy(borrowed: Option<NaiveDate>, returned: Option<NaiveDate>) -> Copy {
        Copy {
            id: 1,
            copy_number: 100,
            purchase_date: day(1),
            borrowed_date: borrowed,
            expected_return_date: None,
            return_date: returned,
            book_id: None,
            library_id: None,
        }
    }

    #[test]
    fn test_never_borrowed_is_available() {
        assert!(copy(None, None).is_available_on(day(10)));
        assert!(copy(None, Some(day(20))).is_available_on(day(10)));
    }

    #[test]
    fn test_borrowed_without_return_is_unavailable() {
        assert!(!copy(Some(day(2)), None).is_available_on(day(10)));
    }

    #[test]
    fn test_return_date_must_be_strictly_past() {
        let c = copy(Some(day(2)), Some(day(10)));
        assert!(c.is_available_on(day(11)));
        assert!(!c.is_available_on(day(10)));
        assert!(!c.is_available_on(day(9)));
    }
}
