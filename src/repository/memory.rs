//! In-memory unit of work for tests
//!
//! `begin` snapshots the shared state; `commit` publishes the snapshot back.
//! Dropping a unit discards its writes.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::stores::{ActivityLog, BorrowLedger, BorrowUnit, CopyStore, LateFeeLedger, UnitOfWork, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{Borrow, LateFee, NewBorrow, NewLateFee, NewUserActivity, UserActivity},
        copy::Copy,
        user::User,
    },
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub copies: BTreeMap<i64, Copy>,
    pub users: BTreeMap<i64, User>,
    pub borrows: Vec<Borrow>,
    pub late_fees: Vec<LateFee>,
    pub activities: Vec<UserActivity>,
    /// Makes every activity write fail, to exercise rollback
    pub fail_activity_writes: bool,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryUnitOfWork {
    state: Arc<Mutex<MemoryState>>,
    copy_locks: Arc<AtomicUsize>,
}

impl MemoryUnitOfWork {
    pub fn new(state: MemoryState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            copy_locks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of locking copy reads across all units
    pub fn copy_locks(&self) -> usize {
        self.copy_locks.load(Ordering::SeqCst)
    }

    /// Committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    type Unit = MemoryUnit;

    async fn begin(&self) -> AppResult<MemoryUnit> {
        let working = self.state.lock().await.clone();
        Ok(MemoryUnit {
            working,
            shared: self.state.clone(),
            copy_locks: self.copy_locks.clone(),
        })
    }
}

pub struct MemoryUnit {
    working: MemoryState,
    shared: Arc<Mutex<MemoryState>>,
    copy_locks: Arc<AtomicUsize>,
}

#[async_trait]
impl CopyStore for MemoryUnit {
    async fn peek_copy(&mut self, id: i64) -> AppResult<Option<Copy>> {
        Ok(self.working.copies.get(&id).cloned())
    }

    async fn find_copy(&mut self, id: i64) -> AppResult<Option<Copy>> {
        self.copy_locks.fetch_add(1, Ordering::SeqCst);
        Ok(self.working.copies.get(&id).cloned())
    }

    async fn save_copy(&mut self, copy: Copy) -> AppResult<Copy> {
        match self.working.copies.get_mut(&copy.id) {
            Some(stored) => {
                *stored = copy.clone();
                Ok(copy)
            }
            None => Err(AppError::NotFound(format!("Copy with id {} not found", copy.id))),
        }
    }
}

#[async_trait]
impl UserStore for MemoryUnit {
    async fn find_user(&mut self, id: i64) -> AppResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }
}

#[async_trait]
impl BorrowLedger for MemoryUnit {
    async fn save_borrow(&mut self, borrow: NewBorrow) -> AppResult<Borrow> {
        let row = Borrow {
            id: self.working.next_id(),
            copy_id: borrow.copy_id,
            user_id: borrow.user_id,
            date_of_borrow: borrow.date_of_borrow,
            expected_return_date: borrow.expected_return_date,
            return_date: borrow.return_date,
        };
        self.working.borrows.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl LateFeeLedger for MemoryUnit {
    async fn save_late_fee(&mut self, fee: NewLateFee) -> AppResult<LateFee> {
        let row = LateFee {
            id: self.working.next_id(),
            borrow_id: fee.borrow_id,
            amount: fee.amount,
            date: fee.date,
        };
        self.working.late_fees.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ActivityLog for MemoryUnit {
    async fn save_activity(&mut self, activity: NewUserActivity) -> AppResult<UserActivity> {
        if self.working.fail_activity_writes {
            return Err(AppError::Internal("activity log unavailable".to_string()));
        }
        let row = UserActivity {
            id: self.working.next_id(),
            user_id: activity.user_id,
            copy_id: activity.copy_id,
            action_type: activity.action_type,
            borrow_date: activity.borrow_date,
            return_date: activity.return_date,
            created_at: Utc::now(),
        };
        self.working.activities.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl BorrowUnit for MemoryUnit {
    async fn commit(self) -> AppResult<()> {
        *self.shared.lock().await = self.working;
        Ok(())
    }
}
