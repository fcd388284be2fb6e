pub mod failure_log;
pub mod packages;
pub mod sync_db;
