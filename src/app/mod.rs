pub mod auth;
pub mod database_service;
pub mod derived;
pub mod writer;
