use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;

use crate::errors::AppError;
use crate::handlers::{
    CreateVaccine, DeleteVaccine, GetVaccineById, ListVaccines, Mediator, UpdateVaccine,
};
use crate::models::{CreateVaccineRequest, UpdateVaccineRequest, VaccineResponse};

/// Vaccine catalog routes
pub fn vaccine_routes() -> Router<Mediator> {
    Router::new()
        .route("/", get(list_vaccines).post(create_vaccine))
        .route(
            "/:id",
            get(get_vaccine).patch(update_vaccine).delete(delete_vaccine),
        )
}

#[tracing::instrument(skip(mediator))]
async fn list_vaccines(
    State(mediator): State<Mediator>,
) -> Result<Json<Vec<VaccineResponse>>, AppError> {
    Ok(Json(mediator.send(ListVaccines).await?))
}

#[tracing::instrument(skip(mediator))]
async fn get_vaccine(
    State(mediator): State<Mediator>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<Json<VaccineResponse>, AppError> {
    Ok(Json(mediator.send(GetVaccineById { id }).await?))
}

#[tracing::instrument(skip(mediator, request))]
async fn create_vaccine(
    State(mediator): State<Mediator>,
    WithRejection(Json(request), _): WithRejection<Json<CreateVaccineRequest>, AppError>,
) -> Result<Json<VaccineResponse>, AppError> {
    Ok(Json(mediator.send(CreateVaccine(request)).await?))
}

#[tracing::instrument(skip(mediator, changes))]
async fn update_vaccine(
    State(mediator): State<Mediator>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
    WithRejection(Json(changes), _): WithRejection<Json<UpdateVaccineRequest>, AppError>,
) -> Result<Json<VaccineResponse>, AppError> {
    Ok(Json(mediator.send(UpdateVaccine { id, changes }).await?))
}

#[tracing::instrument(skip(mediator))]
async fn delete_vaccine(
    State(mediator): State<Mediator>,
    WithRejection(Path(id), _): WithRejection<Path<i32>, AppError>,
) -> Result<StatusCode, AppError> {
    mediator.send(DeleteVaccine { id }).await?;
    Ok(StatusCode::NO_CONTENT)
}
