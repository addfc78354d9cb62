use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    AccountRepository, Repository, Store, StoreError, UnitOfWork, UserRepository,
    VaccinationRepository, VaccineRepository,
};
use crate::models::{
    Account, NewAccount, NewUser, NewVaccination, NewVaccine, User, Vaccination,
    VaccinationDetails, Vaccine,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: BTreeMap<i32, Account>,
    users: BTreeMap<i32, User>,
    vaccines: BTreeMap<i32, Vaccine>,
    vaccinations: BTreeMap<i32, Vaccination>,
    last_ids: LastIds,
}

#[derive(Debug, Clone, Copy, Default)]
struct LastIds {
    account: i32,
    user: i32,
    vaccine: i32,
    vaccination: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

fn row_not_found() -> StoreError {
    StoreError::Database(sqlx::Error::RowNotFound)
}

/// Process-local store with the same constraints as the SQL schema: unique
/// email, unique vaccine code, unique (user, vaccine, dose), and cascading
/// deletes of vaccinations.
///
/// A unit of work holds the store lock until it is committed or dropped, so
/// units of work run one at a time.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

/// Changes go to a private copy of the tables and replace the shared
/// tables on commit.
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn accounts(&mut self) -> &mut dyn AccountRepository {
        self
    }

    fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    fn vaccines(&mut self) -> &mut dyn VaccineRepository {
        self
    }

    fn vaccinations(&mut self) -> &mut dyn VaccinationRepository {
        self
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

impl MemoryUnitOfWork {
    fn ensure_unique_email(&self, email: &str, except: Option<i32>) -> Result<(), StoreError> {
        let taken = self
            .working
            .accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != except);
        if taken {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate account email {email}"
            )));
        }
        Ok(())
    }

    fn ensure_unique_code(&self, code: &str, except: Option<i32>) -> Result<(), StoreError> {
        let taken = self
            .working
            .vaccines
            .values()
            .any(|v| v.code == code && Some(v.id) != except);
        if taken {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate vaccine code {code}"
            )));
        }
        Ok(())
    }

    fn ensure_unique_dose(
        &self,
        user_id: i32,
        vaccine_id: i32,
        dose: i32,
        except: Option<i32>,
    ) -> Result<(), StoreError> {
        let taken = self.working.vaccinations.values().any(|v| {
            v.user_id == user_id
                && v.vaccine_id == vaccine_id
                && v.dose == dose
                && Some(v.id) != except
        });
        if taken {
            return Err(StoreError::UniqueViolation(format!(
                "duplicate dose {dose} of vaccine {vaccine_id} for user {user_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<Account> for MemoryUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn list(&mut self) -> Result<Vec<Account>, StoreError> {
        Ok(self.working.accounts.values().cloned().collect())
    }

    async fn add(&mut self, draft: NewAccount) -> Result<Account, StoreError> {
        self.ensure_unique_email(&draft.email, None)?;

        let now = Utc::now();
        let account = Account {
            id: next(&mut self.working.last_ids.account),
            email: draft.email,
            password_hash: draft.password_hash,
            salt: draft.salt,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        self.working.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&mut self, account: &Account) -> Result<Account, StoreError> {
        self.ensure_unique_email(&account.email, Some(account.id))?;

        let stored = self
            .working
            .accounts
            .get_mut(&account.id)
            .ok_or_else(row_not_found)?;
        *stored = Account {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..account.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        Ok(self.working.accounts.remove(&id).is_some())
    }
}

#[async_trait]
impl AccountRepository for MemoryUnitOfWork {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .working
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }
}

#[async_trait]
impl Repository<User> for MemoryUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn list(&mut self) -> Result<Vec<User>, StoreError> {
        Ok(self.working.users.values().cloned().collect())
    }

    async fn add(&mut self, draft: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let user = User {
            id: next(&mut self.working.last_ids.user),
            name: draft.name,
            gender: draft.gender,
            birth_date: draft.birth_date,
            created_at: now,
            updated_at: now,
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&mut self, user: &User) -> Result<User, StoreError> {
        let stored = self
            .working
            .users
            .get_mut(&user.id)
            .ok_or_else(row_not_found)?;
        *stored = User {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let removed = self.working.users.remove(&id).is_some();
        if removed {
            self.working.vaccinations.retain(|_, v| v.user_id != id);
        }
        Ok(removed)
    }
}

impl UserRepository for MemoryUnitOfWork {}

#[async_trait]
impl Repository<Vaccine> for MemoryUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<Vaccine>, StoreError> {
        Ok(self.working.vaccines.get(&id).cloned())
    }

    async fn list(&mut self) -> Result<Vec<Vaccine>, StoreError> {
        Ok(self.working.vaccines.values().cloned().collect())
    }

    async fn add(&mut self, draft: NewVaccine) -> Result<Vaccine, StoreError> {
        self.ensure_unique_code(&draft.code, None)?;

        let now = Utc::now();
        let vaccine = Vaccine {
            id: next(&mut self.working.last_ids.vaccine),
            name: draft.name,
            code: draft.code,
            doses: draft.doses,
            minimum_age: draft.minimum_age,
            maximum_age: draft.maximum_age,
            created_at: now,
            updated_at: now,
        };
        self.working.vaccines.insert(vaccine.id, vaccine.clone());
        Ok(vaccine)
    }

    async fn update(&mut self, vaccine: &Vaccine) -> Result<Vaccine, StoreError> {
        self.ensure_unique_code(&vaccine.code, Some(vaccine.id))?;

        let stored = self
            .working
            .vaccines
            .get_mut(&vaccine.id)
            .ok_or_else(row_not_found)?;
        *stored = Vaccine {
            created_at: stored.created_at,
            updated_at: Utc::now(),
            ..vaccine.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let removed = self.working.vaccines.remove(&id).is_some();
        if removed {
            self.working.vaccinations.retain(|_, v| v.vaccine_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl VaccineRepository for MemoryUnitOfWork {
    async fn find_by_code(&mut self, code: &str) -> Result<Option<Vaccine>, StoreError> {
        Ok(self
            .working
            .vaccines
            .values()
            .find(|v| v.code == code)
            .cloned())
    }
}

#[async_trait]
impl Repository<Vaccination> for MemoryUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<Vaccination>, StoreError> {
        Ok(self.working.vaccinations.get(&id).cloned())
    }

    async fn list(&mut self) -> Result<Vec<Vaccination>, StoreError> {
        Ok(self.working.vaccinations.values().cloned().collect())
    }

    async fn add(&mut self, draft: NewVaccination) -> Result<Vaccination, StoreError> {
        if !self.working.users.contains_key(&draft.user_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "user {} does not exist",
                draft.user_id
            )));
        }
        if !self.working.vaccines.contains_key(&draft.vaccine_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "vaccine {} does not exist",
                draft.vaccine_id
            )));
        }
        self.ensure_unique_dose(draft.user_id, draft.vaccine_id, draft.dose, None)?;

        let now = Utc::now();
        let vaccination = Vaccination {
            id: next(&mut self.working.last_ids.vaccination),
            user_id: draft.user_id,
            vaccine_id: draft.vaccine_id,
            vaccination_date: draft.vaccination_date,
            dose: draft.dose,
            created_at: now,
            updated_at: now,
        };
        self.working
            .vaccinations
            .insert(vaccination.id, vaccination.clone());
        Ok(vaccination)
    }

    async fn update(&mut self, vaccination: &Vaccination) -> Result<Vaccination, StoreError> {
        self.ensure_unique_dose(
            vaccination.user_id,
            vaccination.vaccine_id,
            vaccination.dose,
            Some(vaccination.id),
        )?;

        let stored = self
            .working
            .vaccinations
            .get_mut(&vaccination.id)
            .ok_or_else(row_not_found)?;
        // user and vaccine references are fixed once recorded
        stored.vaccination_date = vaccination.vaccination_date;
        stored.dose = vaccination.dose;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        Ok(self.working.vaccinations.remove(&id).is_some())
    }
}

#[async_trait]
impl VaccinationRepository for MemoryUnitOfWork {
    async fn find_dose(
        &mut self,
        user_id: i32,
        vaccine_id: i32,
        dose: i32,
    ) -> Result<Option<Vaccination>, StoreError> {
        Ok(self
            .working
            .vaccinations
            .values()
            .find(|v| v.user_id == user_id && v.vaccine_id == vaccine_id && v.dose == dose)
            .cloned())
    }

    async fn list_for_user(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<VaccinationDetails>, StoreError> {
        let mut details: Vec<VaccinationDetails> = self
            .working
            .vaccinations
            .values()
            .filter(|v| v.user_id == user_id)
            .filter_map(|v| {
                self.working
                    .vaccines
                    .get(&v.vaccine_id)
                    .map(|vaccine| VaccinationDetails {
                        vaccination: v.clone(),
                        vaccine_name: vaccine.name.clone(),
                    })
            })
            .collect();
        details.sort_by_key(|d| (d.vaccination.vaccination_date, d.vaccination.id));
        Ok(details)
    }
}
