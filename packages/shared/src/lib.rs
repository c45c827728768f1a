pub mod auth;
pub mod engines;
pub mod models;
pub mod repositories;
pub mod services;
