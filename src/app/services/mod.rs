pub mod service;
pub mod session_service;
