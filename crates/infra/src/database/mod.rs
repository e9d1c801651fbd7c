//! Database implementations

pub mod manager;
pub mod session_repository;

pub use manager::{DbConnection, DbManager};
pub use session_repository::SqliteSessionStore;
