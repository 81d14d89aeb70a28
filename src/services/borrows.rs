//! Borrow/return workflow

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::clock::Clock;
use crate::{
    config::BorrowingConfig,
    error::{AppError, AppResult},
    models::borrow::{ActivityType, Borrow, LateFee, NewBorrow, NewLateFee, NewUserActivity},
    repository::stores::{BorrowLedger, BorrowUnit, CopyStore, LateFeeLedger, UnitOfWork},
};

/// Outcome of a return
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnReceipt {
    pub borrow: Borrow,
    pub late_fee: Option<LateFee>,
}

#[derive(Clone)]
pub struct BorrowService<W: UnitOfWork> {
    unit_of_work: W,
    clock: Arc<dyn Clock>,
    config: BorrowingConfig,
}

impl<W: UnitOfWork> BorrowService<W> {
    pub fn new(unit_of_work: W, clock: Arc<dyn Clock>, config: BorrowingConfig) -> Self {
        Self {
            unit_of_work,
            clock,
            config,
        }
    }

    /// Whether the copy can be borrowed right now. A missing copy is not available.
    pub async fn is_copy_available(&self, copy_id: i64) -> AppResult<bool> {
        let mut unit = self.unit_of_work.begin().await?;
        let available = unit
            .peek_copy(copy_id)
            .await?
            .map(|copy| copy.is_available_on(self.clock.today()))
            .unwrap_or(false);
        Ok(available)
    }

    /// Lend a copy to a user
    pub async fn borrow_copy(&self, copy_id: i64, user_id: i64) -> AppResult<Borrow> {
        let mut unit = self.unit_of_work.begin().await?;
        let (mut copy, user) = load_copy_and_user(&mut unit, copy_id, user_id).await?;

        let today = self.clock.today();
        if !copy.is_available_on(today) {
            tracing::info!(copy_id, user_id, "Borrow refused: copy not available");
            return Err(AppError::CopyNotAvailable(copy_id));
        }

        let expected_return_date = self.due_date(today);
        let borrow = unit
            .save_borrow(NewBorrow {
                copy_id: copy.id,
                user_id: user.id,
                date_of_borrow: today,
                expected_return_date,
                return_date: None,
            })
            .await?;

        copy.borrowed_date = Some(today);
        copy.expected_return_date = Some(expected_return_date);
        copy.return_date = None;
        unit.save_copy(copy).await?;

        log_activity(&mut unit, user.id, copy_id, ActivityType::Borrow, today, None).await?;
        unit.commit().await?;

        tracing::info!(
            copy_id,
            user_id,
            borrow_id = borrow.id,
            expected_return_date = %expected_return_date,
            "Copy borrowed"
        );
        Ok(borrow)
    }

    /// Take a copy back, charging a late fee when overdue.
    ///
    /// The outstanding borrow is not looked up: a new borrow record dated today is
    /// written, and lateness is measured against the copy's expected return date
    /// while the copy is out. A copy that is not out is never late.
    pub async fn return_copy(&self, copy_id: i64, user_id: i64) -> AppResult<ReturnReceipt> {
        let mut unit = self.unit_of_work.begin().await?;
        let (mut copy, user) = load_copy_and_user(&mut unit, copy_id, user_id).await?;

        let today = self.clock.today();
        // Only a copy that is still out has a due date to be late against
        let expected_return_date = match (copy.borrowed_date, copy.return_date, copy.expected_return_date) {
            (Some(_), None, Some(due)) => due,
            _ => self.due_date(today),
        };
        let mut view = NewBorrow {
            copy_id: copy.id,
            user_id: user.id,
            date_of_borrow: today,
            expected_return_date,
            return_date: None,
        };
        let days_late = view.days_late(today);
        let borrow_date = view.date_of_borrow;

        view.return_date = Some(today);
        let borrow = unit.save_borrow(view).await?;

        let late_fee = match days_late {
            Some(days) => {
                let amount = Decimal::from(days) * self.config.late_fee_per_day;
                let fee = unit
                    .save_late_fee(NewLateFee {
                        borrow_id: borrow.id,
                        amount,
                        date: today,
                    })
                    .await?;
                tracing::warn!(copy_id, user_id, days_late = days, amount = %amount, "Late return");
                Some(fee)
            }
            None => None,
        };

        copy.expected_return_date = Some(today);
        copy.return_date = Some(today);
        unit.save_copy(copy).await?;

        log_activity(&mut unit, user.id, copy_id, ActivityType::Return, borrow_date, Some(today)).await?;
        unit.commit().await?;

        tracing::info!(copy_id, user_id, borrow_id = borrow.id, "Copy returned");
        Ok(ReturnReceipt { borrow, late_fee })
    }

    fn due_date(&self, from: NaiveDate) -> NaiveDate {
        from + Duration::days(self.config.loan_period_days)
    }
}

async fn load_copy_and_user<U: BorrowUnit>(
    unit: &mut U,
    copy_id: i64,
    user_id: i64,
) -> AppResult<(crate::models::Copy, crate::models::User)> {
    let copy = unit
        .find_copy(copy_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", copy_id)))?;
    let user = unit
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))?;
    Ok((copy, user))
}

async fn log_activity<U: BorrowUnit>(
    unit: &mut U,
    user_id: i64,
    copy_id: i64,
    action_type: ActivityType,
    borrow_date: NaiveDate,
    return_date: Option<NaiveDate>,
) -> AppResult<()> {
    unit.save_activity(NewUserActivity {
        user_id,
        copy_id,
        action_type,
        borrow_date,
        return_date,
    })
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Copy, User},
        repository::memory::{MemoryState, MemoryUnitOfWork},
        services::clock::MockClock,
    };
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    const COPY: i64 = 10;
    const USER: i64 = 20;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
    }

    fn copy(borrowed: Option<NaiveDate>, returned: Option<NaiveDate>) -> Copy {
        Copy {
            id: COPY,
            copy_number: 1001,
            purchase_date: day(-100),
            borrowed_date: borrowed,
            expected_return_date: None,
            return_date: returned,
            book_id: None,
            library_id: None,
        }
    }

    fn user() -> User {
        User {
            id: USER,
            username: "reader".to_string(),
            password: String::new(),
            email: None,
            firstname: None,
            lastname: None,
            enabled: true,
            locked: false,
            failed_login_attempts: 0,
            created_at: Utc::now(),
            updated_at: None,
            roles: Vec::new(),
        }
    }

    fn store(copy: Copy) -> MemoryUnitOfWork {
        let mut state = MemoryState::default();
        state.copies.insert(copy.id, copy);
        state.users.insert(USER, user());
        MemoryUnitOfWork::new(state)
    }

    fn service_on(store: &MemoryUnitOfWork, today: NaiveDate) -> BorrowService<MemoryUnitOfWork> {
        let mut clock = MockClock::new();
        clock.expect_today().return_const(today);
        BorrowService::new(store.clone(), Arc::new(clock), BorrowingConfig::default())
    }

    #[tokio::test]
    async fn test_never_borrowed_copy_is_available() {
        let store = store(copy(None, None));
        let service = service_on(&store, day(0));

        assert!(assert_ok!(service.is_copy_available(COPY).await));
    }

    #[tokio::test]
    async fn test_missing_copy_is_not_available() {
        let store = store(copy(None, None));
        let service = service_on(&store, day(0));

        assert!(!assert_ok!(service.is_copy_available(999).await));
    }

    #[tokio::test]
    async fn test_availability_follows_return_date() {
        let out = store(copy(Some(day(0)), None));
        assert!(!assert_ok!(service_on(&out, day(5)).is_copy_available(COPY).await));

        let back = store(copy(Some(day(0)), Some(day(10))));
        assert!(!assert_ok!(service_on(&back, day(9)).is_copy_available(COPY).await));
        assert!(!assert_ok!(service_on(&back, day(10)).is_copy_available(COPY).await));
        assert!(assert_ok!(service_on(&back, day(11)).is_copy_available(COPY).await));
    }

    #[tokio::test]
    async fn test_borrow_available_copy() {
        let store = store(copy(None, None));
        let borrow = assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);

        assert_eq!(borrow.date_of_borrow, day(0));
        assert_eq!(borrow.expected_return_date, day(30));
        assert_eq!(borrow.return_date, None);

        let state = store.snapshot().await;
        let stored = &state.copies[&COPY];
        assert_eq!(stored.borrowed_date, Some(day(0)));
        assert_eq!(stored.expected_return_date, Some(day(30)));
        assert_eq!(state.borrows, vec![borrow]);

        assert_eq!(state.activities.len(), 1);
        let activity = &state.activities[0];
        assert_eq!(activity.action_type, ActivityType::Borrow);
        assert_eq!(activity.borrow_date, day(0));
        assert_eq!(activity.return_date, None);
        assert_eq!((activity.user_id, activity.copy_id), (USER, COPY));
    }

    #[tokio::test]
    async fn test_borrowed_copy_cannot_be_borrowed_again() {
        let store = store(copy(None, None));
        assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);
        let before = store.snapshot().await;

        let err = assert_err!(service_on(&store, day(3)).borrow_copy(COPY, USER).await);
        assert!(matches!(err, AppError::CopyNotAvailable(COPY)));

        let after = store.snapshot().await;
        assert_eq!(after.copies, before.copies);
        assert_eq!(after.borrows, before.borrows);
        assert_eq!(after.activities, before.activities);
    }

    #[tokio::test]
    async fn test_borrow_missing_copy_or_user() {
        let store = store(copy(None, None));
        let service = service_on(&store, day(0));

        assert!(matches!(service.borrow_copy(999, USER).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.borrow_copy(COPY, 999).await, Err(AppError::NotFound(_))));
        assert!(store.snapshot().await.borrows.is_empty());
    }

    #[tokio::test]
    async fn test_late_return_charges_five_per_day() {
        let store = store(copy(None, None));
        assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);

        let receipt = assert_ok!(service_on(&store, day(35)).return_copy(COPY, USER).await);

        let fee = receipt.late_fee.expect("late fee");
        assert_eq!(fee.amount, Decimal::new(250, 1));
        assert_eq!(fee.date, day(35));
        assert_eq!(fee.borrow_id, receipt.borrow.id);

        let state = store.snapshot().await;
        assert_eq!(state.late_fees, vec![fee]);
    }

    #[tokio::test]
    async fn test_early_return_has_no_fee() {
        let store = store(copy(None, None));
        assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);

        let receipt = assert_ok!(service_on(&store, day(10)).return_copy(COPY, USER).await);

        assert!(receipt.late_fee.is_none());
        assert_eq!(receipt.borrow.return_date, Some(day(10)));

        let state = store.snapshot().await;
        assert!(state.late_fees.is_empty());
        let stored = &state.copies[&COPY];
        assert_eq!(stored.expected_return_date, Some(day(10)));
        assert_eq!(stored.return_date, Some(day(10)));

        let last = state.activities.last().unwrap();
        assert_eq!(last.action_type, ActivityType::Return);
        assert_eq!(last.borrow_date, day(10));
        assert_eq!(last.return_date, Some(day(10)));
    }

    #[tokio::test]
    async fn test_return_on_due_date_has_no_fee() {
        let store = store(copy(None, None));
        assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);

        let receipt = assert_ok!(service_on(&store, day(30)).return_copy(COPY, USER).await);
        assert!(receipt.late_fee.is_none());
    }

    #[tokio::test]
    async fn test_returned_copy_is_available_from_next_day() {
        let store = store(copy(None, None));
        assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);
        assert_ok!(service_on(&store, day(10)).return_copy(COPY, USER).await);

        assert!(!assert_ok!(service_on(&store, day(10)).is_copy_available(COPY).await));
        let borrow = assert_ok!(service_on(&store, day(11)).borrow_copy(COPY, USER).await);
        assert_eq!(borrow.expected_return_date, day(41));

        let stored = &store.snapshot().await.copies[&COPY];
        assert_eq!(stored.borrowed_date, Some(day(11)));
        assert_eq!(stored.return_date, None);
    }

    #[tokio::test]
    async fn test_past_return_date_makes_copy_borrowable_without_return() {
        // No return action was recorded, only an elapsed return date
        let store = store(copy(Some(day(0)), Some(day(5))));
        assert_ok!(service_on(&store, day(6)).borrow_copy(COPY, USER).await);
    }

    #[tokio::test]
    async fn test_return_writes_new_borrow_instead_of_closing_outstanding_one() {
        // The outstanding borrow stays open; a second record dated on the
        // return day is written.
        let store = store(copy(None, None));
        let original = assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);
        let receipt = assert_ok!(service_on(&store, day(12)).return_copy(COPY, USER).await);

        let state = store.snapshot().await;
        assert_eq!(state.borrows.len(), 2);
        assert_eq!(state.borrows[0], original);
        assert_eq!(state.borrows[0].return_date, None);
        assert_ne!(receipt.borrow.id, original.id);
        assert_eq!(receipt.borrow.date_of_borrow, day(12));
    }

    #[tokio::test]
    async fn test_return_of_never_borrowed_copy_is_accepted() {
        let store = store(copy(None, None));
        let receipt = assert_ok!(service_on(&store, day(3)).return_copy(COPY, USER).await);

        assert!(receipt.late_fee.is_none());
        assert_eq!(receipt.borrow.expected_return_date, day(33));
        assert_eq!(store.snapshot().await.activities.len(), 1);
    }

    #[tokio::test]
    async fn test_second_return_charges_nothing_for_shelf_days() {
        let store = store(copy(None, None));
        assert_ok!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);
        assert_ok!(service_on(&store, day(10)).return_copy(COPY, USER).await);

        let receipt = assert_ok!(service_on(&store, day(20)).return_copy(COPY, USER).await);

        assert!(receipt.late_fee.is_none());
        assert_eq!(receipt.borrow.expected_return_date, day(50));
        assert!(store.snapshot().await.late_fees.is_empty());
    }

    #[tokio::test]
    async fn test_return_of_copy_with_elapsed_return_date_has_no_fee() {
        let mut stale = copy(Some(day(0)), Some(day(5)));
        stale.expected_return_date = Some(day(5));
        let store = store(stale);

        let receipt = assert_ok!(service_on(&store, day(40)).return_copy(COPY, USER).await);
        assert!(receipt.late_fee.is_none());
    }

    #[tokio::test]
    async fn test_availability_check_takes_no_row_lock() {
        let store = store(copy(None, None));
        let service = service_on(&store, day(0));

        assert!(assert_ok!(service.is_copy_available(COPY).await));
        assert_eq!(store.copy_locks(), 0);

        assert_ok!(service.borrow_copy(COPY, USER).await);
        assert_eq!(store.copy_locks(), 1);
    }

    #[tokio::test]
    async fn test_return_for_missing_user_writes_nothing() {
        let store = store(copy(Some(day(0)), None));
        let err = assert_err!(service_on(&store, day(3)).return_copy(COPY, 999).await);

        assert!(matches!(err, AppError::NotFound(_)));
        let state = store.snapshot().await;
        assert!(state.borrows.is_empty());
        assert!(state.activities.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_whole_borrow() {
        let mut state = MemoryState::default();
        state.copies.insert(COPY, copy(None, None));
        state.users.insert(USER, user());
        state.fail_activity_writes = true;
        let store = MemoryUnitOfWork::new(state);

        let err = assert_err!(service_on(&store, day(0)).borrow_copy(COPY, USER).await);
        assert!(matches!(err, AppError::Internal(_)));

        let state = store.snapshot().await;
        assert!(state.borrows.is_empty());
        assert_eq!(state.copies[&COPY].borrowed_date, None);
    }

    #[tokio::test]
    async fn test_configured_rate_and_period() {
        let store = store(copy(None, None));
        let config = BorrowingConfig {
            loan_period_days: 14,
            late_fee_per_day: Decimal::new(125, 2),
        };
        let mut clock = MockClock::new();
        clock.expect_today().return_const(day(0));
        let service = BorrowService::new(store.clone(), Arc::new(clock), config.clone());
        let borrow = assert_ok!(service.borrow_copy(COPY, USER).await);
        assert_eq!(borrow.expected_return_date, day(14));

        let mut clock = MockClock::new();
        clock.expect_today().return_const(day(18));
        let service = BorrowService::new(store.clone(), Arc::new(clock), config);
        let receipt = assert_ok!(service.return_copy(COPY, USER).await);
        assert_eq!(receipt.late_fee.unwrap().amount, Decimal::new(500, 2));
    }
}
