//! Data models for the library API

pub mod author;
pub mod book;
pub mod borrow;
pub mod copy;
pub mod library;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use borrow::{ActivityType, Borrow, LateFee, UserActivity};
pub use copy::Copy;
pub use library::Library;
pub use user::{RoleName, User, UserShort};
