//! Use-case handlers.
//!
//! Every use case is a request type paired with an implementation of
//! [`Handler`] on [`Mediator`]. Each handler runs validate, load, check,
//! mutate and commit against a single unit of work; any error returned
//! before the commit leaves storage untouched.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{JwtService, PasswordService};
use crate::data::{Entity, Store, UnitOfWork};
use crate::errors::AppError;

pub mod accounts;
pub mod users;
pub mod vaccinations;
pub mod vaccines;

pub use accounts::{Login, Register};
pub use users::{CreateUser, DeleteUser, GetUserById, ListUsers, UpdateUser};
pub use vaccinations::{CreateVaccination, DeleteVaccination, UpdateVaccination};
pub use vaccines::{CreateVaccine, DeleteVaccine, GetVaccineById, ListVaccines, UpdateVaccine};

/// A command or query with the response it produces.
pub trait Request: Send {
    type Response: Send;
}

#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: R) -> Result<R::Response, AppError>;
}

/// Dispatches requests to their handlers and owns the shared collaborators.
#[derive(Clone)]
pub struct Mediator {
    store: Arc<dyn Store>,
    passwords: PasswordService,
    jwt: JwtService,
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("passwords", &self.passwords)
            .field("jwt", &self.jwt)
            .finish_non_exhaustive()
    }
}

impl Mediator {
    pub fn new(store: Arc<dyn Store>, passwords: PasswordService, jwt: JwtService) -> Self {
        Self {
            store,
            passwords,
            jwt,
        }
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, AppError>
    where
        R: Request,
        Self: Handler<R>,
    {
        <Self as Handler<R>>::handle(self, request).await
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, AppError> {
        Ok(self.store.begin().await?)
    }
}

/// Id 0 never names a stored record.
fn require_id<E: Entity>(id: i32) -> Result<i32, AppError> {
    if id == 0 {
        return Err(AppError::not_found(E::NAME, id));
    }
    Ok(id)
}

fn found<E: Entity>(record: Option<E>, id: i32) -> Result<E, AppError> {
    record.ok_or_else(|| AppError::not_found(E::NAME, id))
}
