pub mod config;
pub mod handlers;
pub mod helpers;
pub mod models;
pub mod qa;
pub mod storage;

pub use storage::DbPool;
