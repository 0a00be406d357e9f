pub mod cache;
pub mod error;
pub mod loader;
pub mod models;
