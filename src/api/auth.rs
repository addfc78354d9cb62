use axum::{extract::State, response::Json, routing::post, Router};
use axum_extra::extract::WithRejection;

use crate::errors::AppError;
use crate::handlers::{Login, Mediator, Register};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};

/// Authentication routes
pub fn auth_routes() -> Router<Mediator> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new account
#[tracing::instrument(skip(mediator, request))]
async fn register(
    State(mediator): State<Mediator>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = mediator.send(Register(request)).await?;
    Ok(Json(response))
}

/// Login with email and password
#[tracing::instrument(skip(mediator, request))]
async fn login(
    State(mediator): State<Mediator>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = mediator.send(Login(request)).await?;
    Ok(Json(response))
}
