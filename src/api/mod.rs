// HTTP routes and controllers

pub mod auth;
pub mod health;
pub mod routes;
pub mod users;
pub mod vaccines;

pub use routes::create_routes;
