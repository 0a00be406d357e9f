pub mod chat;
pub mod narrative;
