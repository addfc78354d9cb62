use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validation::{check_past_date, check_required_past_date, Rules};
use super::vaccine::Vaccine;
use crate::errors::FieldError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vaccination {
    pub id: i32,
    pub user_id: i32,
    pub vaccine_id: i32,
    pub vaccination_date: DateTime<Utc>,
    pub dose: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVaccination {
    pub user_id: i32,
    pub vaccine_id: i32,
    pub vaccination_date: DateTime<Utc>,
    pub dose: i32,
}

/// A vaccination joined with the display name of its vaccine.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct VaccinationDetails {
    #[sqlx(flatten)]
    pub vaccination: Vaccination,
    pub vaccine_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateVaccinationRequest {
    #[validate(range(min = 1, message = "VaccineId must be greater than or equal to 1."))]
    pub vaccine_id: i32,
    pub vaccination_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "Dose must be greater than or equal to 1."))]
    pub dose: i32,
}

impl Rules for CreateVaccinationRequest {
    fn rules(&self, now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_required_past_date(
            "vaccinationDate",
            self.vaccination_date.as_ref(),
            now,
            &mut errors,
        );
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateVaccinationRequest {
    pub vaccination_date: Option<DateTime<Utc>>,
}

impl Rules for UpdateVaccinationRequest {
    fn rules(&self, now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match &self.vaccination_date {
            None => errors.push(FieldError::general(
                "At least one field must be provided for update.",
            )),
            Some(date) => check_past_date("vaccinationDate", date, now, &mut errors),
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationResponse {
    pub id: i32,
    pub user_id: i32,
    pub vaccine_id: i32,
    /// Display name of the vaccine.
    pub vaccine: String,
    pub vaccination_date: DateTime<Utc>,
    pub dose: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaccinationResponse {
    pub fn from_parts(vaccination: Vaccination, vaccine: &Vaccine) -> Self {
        VaccinationDetails {
            vaccination,
            vaccine_name: vaccine.name.clone(),
        }
        .into()
    }
}

impl From<VaccinationDetails> for VaccinationResponse {
    fn from(details: VaccinationDetails) -> Self {
        let VaccinationDetails {
            vaccination,
            vaccine_name,
        } = details;
        Self {
            id: vaccination.id,
            user_id: vaccination.user_id,
            vaccine_id: vaccination.vaccine_id,
            vaccine: vaccine_name,
            vaccination_date: vaccination.vaccination_date,
            dose: vaccination.dose,
            created_at: vaccination.created_at,
            updated_at: vaccination.updated_at,
        }
    }
}
