use async_trait::async_trait;
use chrono::Utc;

use super::{Handler, Mediator, Request};
use crate::auth::generate_refresh_token;
use crate::data::StoreError;
use crate::errors::AppError;
use crate::models::{
    validate_payload, Account, AccountInfo, AuthResponse, LoginRequest, NewAccount,
    RegisterRequest,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email already registered";

#[derive(Debug, Clone)]
pub struct Register(pub RegisterRequest);

#[derive(Debug, Clone)]
pub struct Login(pub LoginRequest);

impl Request for Register {
    type Response = AuthResponse;
}

impl Request for Login {
    type Response = AuthResponse;
}

impl Mediator {
    fn issue_tokens(&self, account: &Account) -> Result<AuthResponse, AppError> {
        let (token, expires_at) = self.jwt.create_token(account)?;
        Ok(AuthResponse {
            token,
            refresh_token: generate_refresh_token(),
            expires_at,
            account: AccountInfo::from(account),
        })
    }
}

#[async_trait]
impl Handler<Register> for Mediator {
    #[tracing::instrument(skip_all)]
    async fn handle(&self, request: Register) -> Result<AuthResponse, AppError> {
        let Register(payload) = request;
        validate_payload(&payload)?;

        // bcrypt runs before the unit of work is opened
        let hashed = self.passwords.hash_blocking(payload.password).await?;

        let mut uow = self.begin().await?;
        if uow.accounts().find_by_email(&payload.email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let account = match uow
            .accounts()
            .add(NewAccount {
                email: payload.email,
                password_hash: hashed.hash,
                salt: hashed.salt,
            })
            .await
        {
            Err(StoreError::UniqueViolation(_)) => {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()))
            }
            other => other?,
        };
        uow.commit().await?;

        tracing::info!(account_id = account.id, "account registered");
        self.issue_tokens(&account)
    }
}

#[async_trait]
impl Handler<Login> for Mediator {
    #[tracing::instrument(skip_all)]
    async fn handle(&self, request: Login) -> Result<AuthResponse, AppError> {
        let Login(payload) = request;
        validate_payload(&payload)?;

        let stored = {
            let mut uow = self.begin().await?;
            let found = uow.accounts().find_by_email(&payload.email).await?;
            found
        };
        let account = match stored {
            Some(account) if account.is_active => account,
            Some(account) => {
                tracing::warn!(account_id = account.id, "login attempt on inactive account");
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
            None => return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string())),
        };

        let matches = self
            .passwords
            .verify_blocking(
                payload.password,
                account.password_hash.clone(),
                account.salt.clone(),
            )
            .await?;
        if !matches {
            tracing::warn!(account_id = account.id, "login failed");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        // re-read so changes made while verifying are kept
        let mut uow = self.begin().await?;
        let current = uow
            .accounts()
            .get_by_id(account.id)
            .await?
            .filter(|account| account.is_active)
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;
        let account = uow
            .accounts()
            .update(&Account {
                last_login: Some(Utc::now()),
                ..current
            })
            .await?;
        uow.commit().await?;

        tracing::info!(account_id = account.id, "login succeeded");
        self.issue_tokens(&account)
    }
}
