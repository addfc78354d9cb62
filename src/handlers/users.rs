use async_trait::async_trait;

use super::{found, require_id, Handler, Mediator, Request};
use crate::data::Entity;
use crate::errors::AppError;
use crate::models::{
    validate_payload, CreateUserRequest, UpdateUserRequest, User, UserResponse,
    VaccinationResponse,
};

#[derive(Debug, Clone)]
pub struct CreateUser(pub CreateUserRequest);

#[derive(Debug, Clone)]
pub struct UpdateUser {
    pub id: i32,
    pub changes: UpdateUserRequest,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteUser {
    pub id: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct GetUserById {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListUsers;

impl Request for CreateUser {
    type Response = UserResponse;
}

impl Request for UpdateUser {
    type Response = UserResponse;
}

impl Request for DeleteUser {
    type Response = ();
}

impl Request for GetUserById {
    type Response = UserResponse;
}

impl Request for ListUsers {
    type Response = Vec<UserResponse>;
}

#[async_trait]
impl Handler<CreateUser> for Mediator {
    #[tracing::instrument(skip_all)]
    async fn handle(&self, request: CreateUser) -> Result<UserResponse, AppError> {
        let CreateUser(payload) = request;
        validate_payload(&payload)?;
        let new_user = payload
            .into_new_user()
            .ok_or_else(|| AppError::rule("birthDate is required."))?;

        let mut uow = self.begin().await?;
        let user = uow.users().add(new_user).await?;
        uow.commit().await?;

        tracing::info!(user_id = user.id, "user created");
        Ok(user.into())
    }
}

#[async_trait]
impl Handler<UpdateUser> for Mediator {
    #[tracing::instrument(skip_all, fields(user_id = request.id))]
    async fn handle(&self, request: UpdateUser) -> Result<UserResponse, AppError> {
        let id = require_id::<User>(request.id)?;
        let changes = request.changes.normalized();
        validate_payload(&changes)?;

        let mut uow = self.begin().await?;
        let mut user = found(uow.users().get_by_id(id).await?, id)?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(birth_date) = changes.birth_date {
            user.birth_date = birth_date;
        }
        let user = uow.users().update(&user).await?;
        uow.commit().await?;

        Ok(user.into())
    }
}

#[async_trait]
impl Handler<DeleteUser> for Mediator {
    #[tracing::instrument(skip_all, fields(user_id = request.id))]
    async fn handle(&self, request: DeleteUser) -> Result<(), AppError> {
        let id = require_id::<User>(request.id)?;

        let mut uow = self.begin().await?;
        if !uow.users().delete(id).await? {
            return Err(AppError::not_found(User::NAME, id));
        }
        uow.commit().await?;

        tracing::info!(user_id = id, "user deleted");
        Ok(())
    }
}

#[async_trait]
impl Handler<GetUserById> for Mediator {
    async fn handle(&self, request: GetUserById) -> Result<UserResponse, AppError> {
        let id = require_id::<User>(request.id)?;

        let mut uow = self.begin().await?;
        let user = found(uow.users().get_by_id(id).await?, id)?;
        let vaccinations = uow
            .vaccinations()
            .list_for_user(id)
            .await?
            .into_iter()
            .map(VaccinationResponse::from)
            .collect();

        Ok(UserResponse::from(user).with_vaccinations(vaccinations))
    }
}

#[async_trait]
impl Handler<ListUsers> for Mediator {
    async fn handle(&self, _request: ListUsers) -> Result<Vec<UserResponse>, AppError> {
        let mut uow = self.begin().await?;
        let users = uow.users().list().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }
}
