use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validation::{blank_to_none, check_age_window, Rules};
use crate::errors::FieldError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vaccine {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub doses: i32,
    pub minimum_age: Option<i32>,
    pub maximum_age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vaccine {
    /// Inclusive eligibility window check; an unset bound does not restrict.
    pub fn admits_age(&self, age: i64) -> bool {
        let above_minimum = self.minimum_age.map_or(true, |min| age >= i64::from(min));
        let below_maximum = self.maximum_age.map_or(true, |max| age <= i64::from(max));
        above_minimum && below_maximum
    }

    /// Overwrite only the fields present in the (normalized) request.
    pub fn apply(&mut self, changes: &UpdateVaccineRequest) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(code) = &changes.code {
            self.code = code.clone();
        }
        if let Some(doses) = changes.doses {
            self.doses = doses;
        }
        if changes.minimum_age.is_some() {
            self.minimum_age = changes.minimum_age;
        }
        if changes.maximum_age.is_some() {
            self.maximum_age = changes.maximum_age;
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewVaccine {
    pub name: String,
    pub code: String,
    pub doses: i32,
    pub minimum_age: Option<i32>,
    pub maximum_age: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateVaccineRequest {
    #[validate(length(min = 3, max = 50, message = "Name must have between 3 and 50 characters."))]
    pub name: String,
    #[validate(length(min = 3, max = 10, message = "Code must have between 3 and 10 characters."))]
    pub code: String,
    #[validate(range(min = 1, message = "Doses must be greater than or equal to 1."))]
    pub doses: i32,
    #[validate(range(min = 0, message = "MinimumAge cannot be negative."))]
    pub minimum_age: Option<i32>,
    #[validate(range(min = 0, message = "MaximumAge cannot be negative."))]
    pub maximum_age: Option<i32>,
}

impl Rules for CreateVaccineRequest {
    fn rules(&self, _now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_age_window(self.minimum_age, self.maximum_age, &mut errors);
        errors
    }
}

impl From<CreateVaccineRequest> for NewVaccine {
    fn from(request: CreateVaccineRequest) -> Self {
        Self {
            name: request.name,
            code: request.code,
            doses: request.doses,
            minimum_age: request.minimum_age,
            maximum_age: request.maximum_age,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateVaccineRequest {
    #[validate(length(min = 3, max = 50, message = "Name must have between 3 and 50 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 3, max = 10, message = "Code must have between 3 and 10 characters."))]
    pub code: Option<String>,
    #[validate(range(min = 1, message = "Doses must be greater than or equal to 1."))]
    pub doses: Option<i32>,
    #[validate(range(min = 0, message = "MinimumAge cannot be negative."))]
    pub minimum_age: Option<i32>,
    #[validate(range(min = 0, message = "MaximumAge cannot be negative."))]
    pub maximum_age: Option<i32>,
}

impl UpdateVaccineRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            code: blank_to_none(self.code),
            ..self
        }
    }

    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.doses.is_none()
            && self.minimum_age.is_none()
            && self.maximum_age.is_none()
    }
}

impl Rules for UpdateVaccineRequest {
    fn rules(&self, _now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.is_empty() {
            errors.push(FieldError::general(
                "At least one field must be provided for update.",
            ));
        }
        check_age_window(self.minimum_age, self.maximum_age, &mut errors);
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccineResponse {
    pub id: i32,
    pub name: String,
    pub code: String,
    pub doses: i32,
    pub minimum_age: Option<i32>,
    pub maximum_age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vaccine> for VaccineResponse {
    fn from(vaccine: Vaccine) -> Self {
        Self {
            id: vaccine.id,
            name: vaccine.name,
            code: vaccine.code,
            doses: vaccine.doses,
            minimum_age: vaccine.minimum_age,
            maximum_age: vaccine.maximum_age,
            created_at: vaccine.created_at,
            updated_at: vaccine.updated_at,
        }
    }
}
