//! Borrow ledger types: borrows, late fees and user activity

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

/// One lending event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrow {
    pub id: i64,
    pub copy_id: i64,
    pub user_id: i64,
    pub date_of_borrow: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

/// Borrow record before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBorrow {
    pub copy_id: i64,
    pub user_id: i64,
    pub date_of_borrow: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl NewBorrow {
    /// Days past the expected return date on `returned`, if any
    pub fn days_late(&self, returned: NaiveDate) -> Option<i64> {
        if returned > self.expected_return_date {
            Some((returned - self.expected_return_date).num_days())
        } else {
            None
        }
    }
}

/// Late-fee charge tied to a borrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LateFee {
    pub id: i64,
    pub borrow_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLateFee {
    pub borrow_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
}

/// Kind of action recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Borrow,
    Return,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Borrow => "borrow",
            ActivityType::Return => "return",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrow" => Ok(ActivityType::Borrow),
            "return" => Ok(ActivityType::Return),
            _ => Err(format!("Invalid activity type: {}", s)),
        }
    }
}

// Stored as TEXT
impl sqlx::Type<Postgres> for ActivityType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ActivityType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ActivityType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Audit entry for a borrow or return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserActivity {
    pub id: i64,
    pub user_id: i64,
    pub copy_id: i64,
    pub action_type: ActivityType,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserActivity {
    pub user_id: i64,
    pub copy_id: i64,
    pub action_type: ActivityType,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrow(expected: NaiveDate) -> NewBorrow {
        NewBorrow {
            copy_id: 1,
            user_id: 1,
            date_of_borrow: expected - chrono::Duration::days(30),
            expected_return_date: expected,
            return_date: None,
        }
    }

    #[test]
    fn test_days_late() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let b = borrow(expected);

        assert_eq!(b.days_late(expected), None);
        assert_eq!(b.days_late(expected - chrono::Duration::days(3)), None);
        assert_eq!(b.days_late(expected + chrono::Duration::days(5)), Some(5));
    }

    #[test]
    fn test_activity_type_round_trips_through_str() {
        assert_eq!("borrow".parse::<ActivityType>(), Ok(ActivityType::Borrow));
        assert_eq!(ActivityType::Return.to_string(), "return");
        assert!("lend".parse::<ActivityType>().is_err());
    }
}
