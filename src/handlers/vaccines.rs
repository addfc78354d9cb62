use async_trait::async_trait;

use super::{found, require_id, Handler, Mediator, Request};
use crate::data::{Entity, StoreError};
use crate::errors::{AppError, FieldError};
use crate::models::validation::check_age_window;
use crate::models::{
    validate_payload, CreateVaccineRequest, NewVaccine, UpdateVaccineRequest, Vaccine,
    VaccineResponse,
};

#[derive(Debug, Clone)]
pub struct CreateVaccine(pub CreateVaccineRequest);

#[derive(Debug, Clone)]
pub struct UpdateVaccine {
    pub id: i32,
    pub changes: UpdateVaccineRequest,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteVaccine {
    pub id: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct GetVaccineById {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListVaccines;

impl Request for CreateVaccine {
    type Response = VaccineResponse;
}

impl Request for UpdateVaccine {
    type Response = VaccineResponse;
}

impl Request for DeleteVaccine {
    type Response = ();
}

impl Request for GetVaccineById {
    type Response = VaccineResponse;
}

impl Request for ListVaccines {
    type Response = Vec<VaccineResponse>;
}

fn duplicate_code(code: &str) -> AppError {
    AppError::Validation(vec![FieldError::new(
        "code",
        format!("A vaccine with code {code} already exists."),
    )])
}

#[async_trait]
impl Handler<CreateVaccine> for Mediator {
    #[tracing::instrument(skip_all)]
    async fn handle(&self, request: CreateVaccine) -> Result<VaccineResponse, AppError> {
        let CreateVaccine(payload) = request;
        validate_payload(&payload)?;

        let mut uow = self.begin().await?;
        if uow.vaccines().find_by_code(&payload.code).await?.is_some() {
            return Err(duplicate_code(&payload.code));
        }

        let code = payload.code.clone();
        let vaccine = match uow.vaccines().add(NewVaccine::from(payload)).await {
            Err(StoreError::UniqueViolation(_)) => return Err(duplicate_code(&code)),
            other => other?,
        };
        uow.commit().await?;

        tracing::info!(vaccine_id = vaccine.id, code = %vaccine.code, "vaccine created");
        Ok(vaccine.into())
    }
}

#[async_trait]
impl Handler<UpdateVaccine> for Mediator {
    #[tracing::instrument(skip_all, fields(vaccine_id = request.id))]
    async fn handle(&self, request: UpdateVaccine) -> Result<VaccineResponse, AppError> {
        let id = require_id::<Vaccine>(request.id)?;
        let changes = request.changes.normalized();
        validate_payload(&changes)?;

        let mut uow = self.begin().await?;
        let mut vaccine = found(uow.vaccines().get_by_id(id).await?, id)?;

        if let Some(code) = changes.code.as_deref() {
            if code != vaccine.code && uow.vaccines().find_by_code(code).await?.is_some() {
                return Err(duplicate_code(code));
            }
        }

        vaccine.apply(&changes);

        // a bound supplied alone may contradict the stored one
        let mut errors = Vec::new();
        check_age_window(vaccine.minimum_age, vaccine.maximum_age, &mut errors);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let vaccine = match uow.vaccines().update(&vaccine).await {
            Err(StoreError::UniqueViolation(_)) => return Err(duplicate_code(&vaccine.code)),
            other => other?,
        };
        uow.commit().await?;

        Ok(vaccine.into())
    }
}

#[async_trait]
impl Handler<DeleteVaccine> for Mediator {
    #[tracing::instrument(skip_all, fields(vaccine_id = request.id))]
    async fn handle(&self, request: DeleteVaccine) -> Result<(), AppError> {
        let id = require_id::<Vaccine>(request.id)?;

        let mut uow = self.begin().await?;
        if !uow.vaccines().delete(id).await? {
            return Err(AppError::not_found(Vaccine::NAME, id));
        }
        uow.commit().await?;

        tracing::info!(vaccine_id = id, "vaccine deleted");
        Ok(())
    }
}

#[async_trait]
impl Handler<GetVaccineById> for Mediator {
    async fn handle(&self, request: GetVaccineById) -> Result<VaccineResponse, AppError> {
        let id = require_id::<Vaccine>(request.id)?;

        let mut uow = self.begin().await?;
        let vaccine = found(uow.vaccines().get_by_id(id).await?, id)?;
        Ok(vaccine.into())
    }
}

#[async_trait]
impl Handler<ListVaccines> for Mediator {
    async fn handle(&self, _request: ListVaccines) -> Result<Vec<VaccineResponse>, AppError> {
        let mut uow = self.begin().await?;
        let vaccines = uow.vaccines().list().await?;
        Ok(vaccines.into_iter().map(VaccineResponse::from).collect())
    }
}
