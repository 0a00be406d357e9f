pub mod config;
pub mod controller;
pub mod error;
pub mod factory;
pub mod routes;
pub mod services;
