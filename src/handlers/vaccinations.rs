use async_trait::async_trait;
use chrono::Utc;

use super::{found, require_id, Handler, Mediator, Request};
use crate::data::UnitOfWork;
use crate::errors::AppError;
use crate::models::{
    validate_payload, CreateVaccinationRequest, NewVaccination, UpdateVaccinationRequest, User,
    Vaccination, VaccinationResponse, Vaccine,
};

#[derive(Debug, Clone)]
pub struct CreateVaccination {
    pub user_id: i32,
    pub payload: CreateVaccinationRequest,
}

#[derive(Debug, Clone)]
pub struct UpdateVaccination {
    pub user_id: i32,
    pub vaccination_id: i32,
    pub changes: UpdateVaccinationRequest,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteVaccination {
    pub user_id: i32,
    pub vaccination_id: i32,
}

impl Request for CreateVaccination {
    type Response = VaccinationResponse;
}

impl Request for UpdateVaccination {
    type Response = VaccinationResponse;
}

impl Request for DeleteVaccination {
    type Response = ();
}

/// Loads a vaccination and checks that it was recorded for `user_id`.
async fn owned_vaccination(
    uow: &mut dyn UnitOfWork,
    user_id: i32,
    vaccination_id: i32,
) -> Result<Vaccination, AppError> {
    let vaccination = found::<Vaccination>(
        uow.vaccinations().get_by_id(vaccination_id).await?,
        vaccination_id,
    )?;
    if vaccination.user_id != user_id {
        return Err(AppError::NotFound(format!(
            "Vaccination with id {vaccination_id} not found for user {user_id}."
        )));
    }
    Ok(vaccination)
}

#[async_trait]
impl Handler<CreateVaccination> for Mediator {
    #[tracing::instrument(skip_all, fields(user_id = request.user_id, vaccine_id = request.payload.vaccine_id))]
    async fn handle(&self, request: CreateVaccination) -> Result<VaccinationResponse, AppError> {
        let user_id = require_id::<User>(request.user_id)?;
        let vaccine_id = require_id::<Vaccine>(request.payload.vaccine_id)?;
        let payload = request.payload;
        validate_payload(&payload)?;
        let vaccination_date = payload
            .vaccination_date
            .ok_or_else(|| AppError::rule("vaccinationDate is required."))?;

        let mut uow = self.begin().await?;
        let user = found(uow.users().get_by_id(user_id).await?, user_id)?;
        let vaccine = found(uow.vaccines().get_by_id(vaccine_id).await?, vaccine_id)?;

        if !vaccine.admits_age(user.age_at(Utc::now())) {
            return Err(AppError::rule(format!(
                "User is not eligible to take the vaccine {}.",
                vaccine.name
            )));
        }

        if uow
            .vaccinations()
            .find_dose(user_id, vaccine_id, payload.dose)
            .await?
            .is_some()
        {
            return Err(AppError::rule(format!(
                "User already has taken the dose {} of the vaccine {}.",
                payload.dose, vaccine.name
            )));
        }

        if payload.dose > vaccine.doses {
            return Err(AppError::rule(format!(
                "User has already taken all doses of the vaccine {}. Total doses: {}",
                vaccine.name, vaccine.doses
            )));
        }

        let vaccination = uow
            .vaccinations()
            .add(NewVaccination {
                user_id,
                vaccine_id,
                vaccination_date,
                dose: payload.dose,
            })
            .await?;
        uow.commit().await?;

        tracing::info!(vaccination_id = vaccination.id, dose = vaccination.dose, "vaccination recorded");
        Ok(VaccinationResponse::from_parts(vaccination, &vaccine))
    }
}

#[async_trait]
impl Handler<UpdateVaccination> for Mediator {
    #[tracing::instrument(skip_all, fields(user_id = request.user_id, vaccination_id = request.vaccination_id))]
    async fn handle(&self, request: UpdateVaccination) -> Result<VaccinationResponse, AppError> {
        let user_id = require_id::<User>(request.user_id)?;
        let vaccination_id = require_id::<Vaccination>(request.vaccination_id)?;
        validate_payload(&request.changes)?;
        let vaccination_date = request
            .changes
            .vaccination_date
            .ok_or_else(|| AppError::rule("At least one field must be provided for update."))?;

        let mut uow = self.begin().await?;
        found(uow.users().get_by_id(user_id).await?, user_id)?;
        let mut vaccination = owned_vaccination(uow.as_mut(), user_id, vaccination_id).await?;

        vaccination.vaccination_date = vaccination_date;
        let vaccination = uow.vaccinations().update(&vaccination).await?;
        let vaccine_id = vaccination.vaccine_id;
        let vaccine = found(uow.vaccines().get_by_id(vaccine_id).await?, vaccine_id)?;
        uow.commit().await?;

        Ok(VaccinationResponse::from_parts(vaccination, &vaccine))
    }
}

#[async_trait]
impl Handler<DeleteVaccination> for Mediator {
    #[tracing::instrument(skip_all, fields(user_id = request.user_id, vaccination_id = request.vaccination_id))]
    async fn handle(&self, request: DeleteVaccination) -> Result<(), AppError> {
        let user_id = require_id::<User>(request.user_id)?;
        let vaccination_id = require_id::<Vaccination>(request.vaccination_id)?;

        let mut uow = self.begin().await?;
        found(uow.users().get_by_id(user_id).await?, user_id)?;
        owned_vaccination(uow.as_mut(), user_id, vaccination_id).await?;

        uow.vaccinations().delete(vaccination_id).await?;
        uow.commit().await?;

        tracing::info!(vaccination_id, "vaccination deleted");
        Ok(())
    }
}
