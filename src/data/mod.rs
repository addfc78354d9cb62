//! Persistence ports.
//!
//! Handlers open one [`UnitOfWork`] per request through a [`Store`], reach
//! the record collections through its repository accessors and call
//! [`UnitOfWork::commit`] exactly once when the request succeeds. Dropping a
//! unit of work without committing discards every change made through it.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Account, NewAccount, NewUser, NewVaccination, NewVaccine, User, Vaccination,
    VaccinationDetails, Vaccine,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
}

/// A stored record type with an integer identity.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Field values for a record that has not been stored yet.
    type Draft: Send + Sync;
    const NAME: &'static str;

    fn id(&self) -> i32;
}

impl Entity for Account {
    type Draft = NewAccount;
    const NAME: &'static str = "Account";

    fn id(&self) -> i32 {
        self.id
    }
}

impl Entity for User {
    type Draft = NewUser;
    const NAME: &'static str = "User";

    fn id(&self) -> i32 {
        self.id
    }
}

impl Entity for Vaccine {
    type Draft = NewVaccine;
    const NAME: &'static str = "Vaccine";

    fn id(&self) -> i32 {
        self.id
    }
}

impl Entity for Vaccination {
    type Draft = NewVaccination;
    const NAME: &'static str = "Vaccination";

    fn id(&self) -> i32 {
        self.id
    }
}

/// Generic access to one record collection inside a unit of work.
#[async_trait]
pub trait Repository<E: Entity>: Send {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<E>, StoreError>;

    async fn list(&mut self) -> Result<Vec<E>, StoreError>;

    /// Store a new record; the returned entity carries its assigned id and timestamps.
    async fn add(&mut self, draft: E::Draft) -> Result<E, StoreError>;

    /// Persist every mutable field of `entity` and refresh `updated_at`.
    async fn update(&mut self, entity: &E) -> Result<E, StoreError>;

    /// Returns `false` when no record had the given id.
    async fn delete(&mut self, id: i32) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait AccountRepository: Repository<Account> {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
pub trait UserRepository: Repository<User> {}

#[async_trait]
pub trait VaccineRepository: Repository<Vaccine> {
    async fn find_by_code(&mut self, code: &str) -> Result<Option<Vaccine>, StoreError>;
}

#[async_trait]
pub trait VaccinationRepository: Repository<Vaccination> {
    async fn find_dose(
        &mut self,
        user_id: i32,
        vaccine_id: i32,
        dose: i32,
    ) -> Result<Option<Vaccination>, StoreError>;

    /// Every vaccination of a user joined with its vaccine name, oldest first.
    async fn list_for_user(&mut self, user_id: i32)
        -> Result<Vec<VaccinationDetails>, StoreError>;
}

/// One transaction spanning all repositories.
#[async_trait]
pub trait UnitOfWork: Send {
    fn accounts(&mut self) -> &mut dyn AccountRepository;

    fn users(&mut self) -> &mut dyn UserRepository;

    fn vaccines(&mut self) -> &mut dyn VaccineRepository;

    fn vaccinations(&mut self) -> &mut dyn VaccinationRepository;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;
}
