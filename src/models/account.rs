use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validation::Rules;
use crate::auth::PasswordPolicy;
use crate::errors::FieldError;

/// Login identity. Never serialized to clients directly; see [`AccountInfo`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub salt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    #[validate(
        email(message = "Email must be a valid email address."),
        length(max = 255, message = "Email must have at most 255 characters.")
    )]
    pub email: String,
    pub password: String,
}

impl Rules for LoginRequest {
    fn rules(&self, _now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "Email is required."));
        }
        check_password("password", &self.password, &mut errors);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Email must be a valid email address."),
        length(max = 255, message = "Email must have at most 255 characters.")
    )]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Rules for RegisterRequest {
    fn rules(&self, _now: DateTime<Utc>) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.email.trim().is_empty() {
            errors.push(FieldError::new("email", "Email is required."));
        }
        check_password("password", &self.password, &mut errors);
        if self.confirm_password != self.password {
            errors.push(FieldError::new(
                "confirmPassword",
                "Password and confirmation password do not match.",
            ));
        }
        errors
    }
}

fn check_password(field: &str, password: &str, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new(field, "Password is required."));
        return;
    }
    if let Err(e) = PasswordPolicy::default().check(password) {
        errors.push(FieldError::new(field, e.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: i32,
    pub email: String,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub account: AccountInfo,
}
