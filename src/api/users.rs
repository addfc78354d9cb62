use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use axum_extra::extract::WithRejection;

use crate::errors::AppError;
use crate::handlers::{
    CreateUser, CreateVaccination, DeleteUser, DeleteVaccination, GetUserById, ListUsers,
    Mediator, UpdateUser, UpdateVaccination,
};
use crate::models::{
    CreateUserRequest, CreateVaccinationRequest, UpdateUserRequest, UpdateVaccinationRequest,
    UserResponse, VaccinationResponse,
};

/// User routes, including the vaccinations recorded for each user
pub fn user_routes() -> Router<Mediator> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).patch(update_user).delete(delete_user))
        .route("/:id/vaccinations", axum::routing::post(create_vaccination))
        .route(
            "/:id/vaccinations/:vaccination_id",
            patch(update_vaccination).delete(delete_vaccination),
        )
}

#[tracing::instrument(skip(mediator))]
async fn list_users(State(mediator): State<Mediator>) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(mediator.send(ListUsers).await?))
}

#[tracing::instrument(skip(mediator))]
async fn get_user(
    State(mediator): State<Mediator>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(mediator.send(GetUserById { id }).await?))
}

#[tracing::instrument(skip(mediator, request))]
async fn create_user(
    State(mediator): State<Mediator>,
    WithRejection(Json(request), _): WithRejection<Json<CreateUserRequest>, AppError>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(mediator.send(CreateUser(request)).await?))
}

#[tracing::instrument(skip(mediator, changes))]
async fn update_user(
    State(mediator): State<Mediator>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(changes), _): WithRejection<Json<UpdateUserRequest>, AppError>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(mediator.send(UpdateUser { id, changes }).await?))
}

#[tracing::instrument(skip(mediator))]
async fn delete_user(
    State(mediator): State<Mediator>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<StatusCode, AppError> {
    mediator.send(DeleteUser { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(mediator, payload))]
async fn create_vaccination(
    State(mediator): State<Mediator>,
    WithRejection(Path(user_id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(payload), _): WithRejection<Json<CreateVaccinationRequest>, AppError>,
) -> Result<Json<VaccinationResponse>, AppError> {
    Ok(Json(
        mediator.send(CreateVaccination { user_id, payload }).await?,
    ))
}

#[tracing::instrument(skip(mediator, changes))]
async fn update_vaccination(
    State(mediator): State<Mediator>,
    WithRejection(Path((user_id, vaccination_id)), _): WithRejection<Path<(i32, i32)>, AppError>,
    WithRejection(Json(changes), _): WithRejection<Json<UpdateVaccinationRequest>, AppError>,
) -> Result<Json<VaccinationResponse>, AppError> {
    let request = UpdateVaccination {
        user_id,
        vaccination_id,
        changes,
    };
    Ok(Json(mediator.send(request).await?))
}

#[tracing::instrument(skip(mediator))]
async fn delete_vaccination(
    State(mediator): State<Mediator>,
    WithRejection(Path((user_id, vaccination_id)), _): WithRejection<Path<(i32, i32)>, AppError>,
) -> Result<StatusCode, AppError> {
    mediator
        .send(DeleteVaccination {
            user_id,
            vaccination_id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
