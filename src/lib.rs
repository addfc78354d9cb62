// Vaccination record management API

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod errors;
pub mod handlers;
pub mod models;

pub use errors::{AppError, FieldError};
