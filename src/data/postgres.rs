use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    AccountRepository, Repository, Store, StoreError, UnitOfWork, UserRepository,
    VaccinationRepository, VaccineRepository,
};
use crate::models::{
    Account, NewAccount, NewUser, NewVaccination, NewVaccine, User, Vaccination,
    VaccinationDetails, Vaccine,
};

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, salt, is_active, last_login, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, gender, birth_date, created_at, updated_at";
const VACCINE_COLUMNS: &str =
    "id, name, code, doses, minimum_age, maximum_age, created_at, updated_at";
const VACCINATION_COLUMNS: &str =
    "id, user_id, vaccine_id, vaccination_date, dose, created_at, updated_at";

/// Postgres-backed store; every unit of work is one database transaction.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// Uncommitted transactions roll back when dropped.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => return StoreError::UniqueViolation(db.message().to_string()),
            Some("23503") => return StoreError::ForeignKeyViolation(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
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
        let PgUnitOfWork { tx } = *self;
        tx.commit().await.map_err(map_db_error)
    }
}

#[async_trait]
impl Repository<Account> for PgUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn list(&mut self) -> Result<Vec<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id");
        sqlx::query_as::<_, Account>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn add(&mut self, draft: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (email, password_hash, salt, is_active)
             VALUES ($1, $2, $3, TRUE)
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(&draft.email)
            .bind(&draft.password_hash)
            .bind(&draft.salt)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn update(&mut self, account: &Account) -> Result<Account, StoreError> {
        let sql = format!(
            "UPDATE accounts
             SET email = $2, password_hash = $3, salt = $4, is_active = $5,
                 last_login = $6, updated_at = NOW()
             WHERE id = $1
             RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.salt)
            .bind(account.is_active)
            .bind(account.last_login)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AccountRepository for PgUnitOfWork {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl Repository<User> for PgUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn list(&mut self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn add(&mut self, draft: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (name, gender, birth_date)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&draft.name)
            .bind(draft.gender)
            .bind(draft.birth_date)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn update(&mut self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users
             SET name = $2, gender = $3, birth_date = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(user.gender)
            .bind(user.birth_date)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

impl UserRepository for PgUnitOfWork {}

#[async_trait]
impl Repository<Vaccine> for PgUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<Vaccine>, StoreError> {
        let sql = format!("SELECT {VACCINE_COLUMNS} FROM vaccines WHERE id = $1");
        sqlx::query_as::<_, Vaccine>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn list(&mut self) -> Result<Vec<Vaccine>, StoreError> {
        let sql = format!("SELECT {VACCINE_COLUMNS} FROM vaccines ORDER BY id");
        sqlx::query_as::<_, Vaccine>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn add(&mut self, draft: NewVaccine) -> Result<Vaccine, StoreError> {
        let sql = format!(
            "INSERT INTO vaccines (name, code, doses, minimum_age, maximum_age)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {VACCINE_COLUMNS}"
        );
        sqlx::query_as::<_, Vaccine>(&sql)
            .bind(&draft.name)
            .bind(&draft.code)
            .bind(draft.doses)
            .bind(draft.minimum_age)
            .bind(draft.maximum_age)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn update(&mut self, vaccine: &Vaccine) -> Result<Vaccine, StoreError> {
        let sql = format!(
            "UPDATE vaccines
             SET name = $2, code = $3, doses = $4, minimum_age = $5, maximum_age = $6,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {VACCINE_COLUMNS}"
        );
        sqlx::query_as::<_, Vaccine>(&sql)
            .bind(vaccine.id)
            .bind(&vaccine.name)
            .bind(&vaccine.code)
            .bind(vaccine.doses)
            .bind(vaccine.minimum_age)
            .bind(vaccine.maximum_age)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM vaccines WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VaccineRepository for PgUnitOfWork {
    async fn find_by_code(&mut self, code: &str) -> Result<Option<Vaccine>, StoreError> {
        let sql = format!("SELECT {VACCINE_COLUMNS} FROM vaccines WHERE code = $1");
        sqlx::query_as::<_, Vaccine>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl Repository<Vaccination> for PgUnitOfWork {
    async fn get_by_id(&mut self, id: i32) -> Result<Option<Vaccination>, StoreError> {
        let sql = format!("SELECT {VACCINATION_COLUMNS} FROM vaccinations WHERE id = $1");
        sqlx::query_as::<_, Vaccination>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn list(&mut self) -> Result<Vec<Vaccination>, StoreError> {
        let sql = format!("SELECT {VACCINATION_COLUMNS} FROM vaccinations ORDER BY id");
        sqlx::query_as::<_, Vaccination>(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn add(&mut self, draft: NewVaccination) -> Result<Vaccination, StoreError> {
        let sql = format!(
            "INSERT INTO vaccinations (user_id, vaccine_id, vaccination_date, dose)
             VALUES ($1, $2, $3, $4)
             RETURNING {VACCINATION_COLUMNS}"
        );
        sqlx::query_as::<_, Vaccination>(&sql)
            .bind(draft.user_id)
            .bind(draft.vaccine_id)
            .bind(draft.vaccination_date)
            .bind(draft.dose)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn update(&mut self, vaccination: &Vaccination) -> Result<Vaccination, StoreError> {
        let sql = format!(
            "UPDATE vaccinations
             SET vaccination_date = $2, dose = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {VACCINATION_COLUMNS}"
        );
        sqlx::query_as::<_, Vaccination>(&sql)
            .bind(vaccination.id)
            .bind(vaccination.vaccination_date)
            .bind(vaccination.dose)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn delete(&mut self, id: i32) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM vaccinations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(map_db_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VaccinationRepository for PgUnitOfWork {
    async fn find_dose(
        &mut self,
        user_id: i32,
        vaccine_id: i32,
        dose: i32,
    ) -> Result<Option<Vaccination>, StoreError> {
        let sql = format!(
            "SELECT {VACCINATION_COLUMNS} FROM vaccinations
             WHERE user_id = $1 AND vaccine_id = $2 AND dose = $3"
        );
        sqlx::query_as::<_, Vaccination>(&sql)
            .bind(user_id)
            .bind(vaccine_id)
            .bind(dose)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    async fn list_for_user(
        &mut self,
        user_id: i32,
    ) -> Result<Vec<VaccinationDetails>, StoreError> {
        sqlx::query_as::<_, VaccinationDetails>(
            "SELECT v.id, v.user_id, v.vaccine_id, v.vaccination_date, v.dose,
                    v.created_at, v.updated_at, vc.name AS vaccine_name
             FROM vaccinations v
             JOIN vaccines vc ON vc.id = v.vaccine_id
             WHERE v.user_id = $1
             ORDER BY v.vaccination_date, v.id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_db_error)
    }
}
