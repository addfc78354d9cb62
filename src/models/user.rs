use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validation::{blank_to_none, check_past_date, check_required_past_date, Rules};
use super::vaccination::VaccinationResponse;
use crate::errors::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownGender(pub String);

impl fmt::Display for UnknownGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown gender '{}'", self.0)
    }
}

impl std::error::Error for UnknownGender {}

impl FromStr for Gender {
    type Err = UnknownGender;

    /// Case-insensitive match on the variant names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownGender(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub gender: Gender,
    pub birth_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whole years elapsed since birth, counting 365.25 days per year.
    pub fn age_at(&self, now: DateTime<Utc>) -> i64 {
        age_in_years(self.birth_date, now)
    }
}

pub fn age_in_years(birth_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed_days = (now - birth_date).num_milliseconds() as f64 / 86_400_000.0;
    (elapsed_days / 365.25).floor() as i64
}

/// Values for a user that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub gender: Gender,
    pub birth_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 150, message = "Name must have between 3 and 150 characters."))]
    pub name: String,
    pub birth_date: Option<DateTime<Utc>>,
    pub gender: String,
}

impl Rules for CreateUserRequest {
    fn rules(&self, now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_required_past_date("birthDate", self.birth_date.as_ref(), now, &mut errors);

        if self.gender.trim().is_empty() {
            errors.push(FieldError::new("gender", "Gender is required."));
        } else if self.gender.parse::<Gender>().is_err() {
            let allowed: Vec<&str> = Gender::ALL.iter().map(Gender::as_str).collect();
            errors.push(FieldError::new(
                "gender",
                format!("Gender must be one of: {}", allowed.join(", ")),
            ));
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 3, max = 150, message = "Name must have between 3 and 150 characters."))]
    pub name: Option<String>,
    pub birth_date: Option<DateTime<Utc>>,
}

impl UpdateUserRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: blank_to_none(self.name),
            birth_date: self.birth_date,
        }
    }
}

impl Rules for UpdateUserRequest {
    fn rules(&self, now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.is_none() && self.birth_date.is_none() {
            errors.push(FieldError::general(
                "At least one field (name or birthDate) must be provided for update.",
            ));
        }
        if let Some(birth_date) = &self.birth_date {
            check_past_date("birthDate", birth_date, now, &mut errors);
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub gender: Gender,
    pub birth_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vaccinations: Option<Vec<VaccinationResponse>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            gender: user.gender,
            birth_date: user.birth_date,
            created_at: user.created_at,
            updated_at: user.updated_at,
            vaccinations: None,
        }
    }
}

impl UserResponse {
    pub fn with_vaccinations(mut self, vaccinations: Vec<VaccinationResponse>) -> Self {
        self.vaccinations = Some(vaccinations);
        self
    }
}

impl CreateUserRequest {
    /// Only call after validation; an unparseable gender falls back to `Other`.
    pub fn into_new_user(self) -> Option<NewUser> {
        let birth_date = self.birth_date?;
        Some(NewUser {
            name: self.name,
            gender: self.gender.parse().unwrap_or(Gender::Other),
            birth_date,
        })
    }
}
