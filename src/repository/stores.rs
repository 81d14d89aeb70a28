//! Store contracts consumed by the borrow workflow
//!
//! Every store is reached through a [`BorrowUnit`]: one open transaction. A unit
//! that is dropped without [`BorrowUnit::commit`] rolls back all of its writes.

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        borrow::{Borrow, LateFee, NewBorrow, NewLateFee, NewUserActivity, UserActivity},
        copy::Copy,
        user::User,
    },
};

#[async_trait]
pub trait CopyStore: Send {
    /// Plain read, no lock
    async fn peek_copy(&mut self, id: i64) -> AppResult<Option<Copy>>;
    /// Read and lock the copy until the unit ends
    async fn find_copy(&mut self, id: i64) -> AppResult<Option<Copy>>;
    async fn save_copy(&mut self, copy: Copy) -> AppResult<Copy>;
}

#[async_trait]
pub trait UserStore: Send {
    async fn find_user(&mut self, id: i64) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait BorrowLedger: Send {
    async fn save_borrow(&mut self, borrow: NewBorrow) -> AppResult<Borrow>;
}

#[async_trait]
pub trait LateFeeLedger: Send {
    async fn save_late_fee(&mut self, fee: NewLateFee) -> AppResult<LateFee>;
}

#[async_trait]
pub trait ActivityLog: Send {
    async fn save_activity(&mut self, activity: NewUserActivity) -> AppResult<UserActivity>;
}

/// All stores behind a single transaction
#[async_trait]
pub trait BorrowUnit: CopyStore + UserStore + BorrowLedger + LateFeeLedger + ActivityLog {
    async fn commit(self) -> AppResult<()>;
}

/// Opens units of work
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Unit: BorrowUnit;

    async fn begin(&self) -> AppResult<Self::Unit>;
}
