use std::time::Duration;

use assert_matches::assert_matches;

use vaccine_card::data::{InMemoryStore, Store};
use vaccine_card::handlers::{ListUsers, Login, Register};
use vaccine_card::models::{Account, LoginRequest, RegisterRequest};
use vaccine_card::AppError;

use crate::common::{mediator_with_store, test_mediator, TEST_HASH_COST};

const PASSWORD: &str = "Secret123";

fn register(email: &str) -> Register {
    Register(RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
    })
}

fn login(email: &str, password: &str) -> Login {
    Login(LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    })
}

async fn stored_account(store: &InMemoryStore, email: &str) -> Account {
    let mut uow = store.begin().await.unwrap();
    let account = uow.accounts().find_by_email(email).await.unwrap();
    account.expect("account should exist")
}

async fn deactivate(store: &InMemoryStore, email: &str) {
    let account = stored_account(store, email).await;
    let mut uow = store.begin().await.unwrap();
    uow.accounts()
        .update(&Account {
            is_active: false,
            ..account
        })
        .await
        .unwrap();
    uow.commit().await.unwrap();
}

#[cfg(test)]
mod account_handler_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_register_issues_valid_token() {
        let mediator = test_mediator();

        let response = mediator.send(register("nurse@clinic.org")).await.unwrap();

        assert_eq!(response.account.email, "nurse@clinic.org");
        assert!(!response.refresh_token.is_empty());
        let claims = mediator.jwt().validate_token(&response.token).unwrap();
        assert_eq!(claims.email, "nurse@clinic.org");
        assert_eq!(claims.sub, response.account.id.to_string());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mediator = test_mediator();
        mediator.send(register("nurse@clinic.org")).await.unwrap();

        let result = mediator.send(register("nurse@clinic.org")).await;
        assert_matches!(result, Err(AppError::Conflict(msg)) if msg == "Email already registered");
    }

    #[tokio::test]
    async fn test_register_rejects_weak_or_mismatched_passwords() {
        let mediator = test_mediator();

        let weak = Register(RegisterRequest {
            email: "nurse@clinic.org".to_string(),
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        });
        assert_matches!(mediator.send(weak).await, Err(AppError::Validation(_)));

        let mismatched = Register(RegisterRequest {
            email: "nurse@clinic.org".to_string(),
            password: PASSWORD.to_string(),
            confirm_password: "Secret124".to_string(),
        });
        match mediator.send(mismatched).await {
            Err(AppError::Validation(errors)) => {
                assert!(errors
                    .iter()
                    .any(|e| e.field.as_deref() == Some("confirmPassword")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_succeeds_with_registered_credentials() {
        let mediator = test_mediator();
        let registered = mediator.send(register("nurse@clinic.org")).await.unwrap();

        let response = mediator
            .send(login("nurse@clinic.org", PASSWORD))
            .await
            .unwrap();

        assert_eq!(response.account.id, registered.account.id);
        let account = mediator.jwt().authenticate(&response.token).unwrap();
        assert_eq!(account.account_id, registered.account.id);
        assert_eq!(account.email, "nurse@clinic.org");
    }

    #[tokio::test]
    async fn test_login_failures_share_one_message() {
        let mediator = test_mediator();
        mediator.send(register("nurse@clinic.org")).await.unwrap();

        let wrong_password = mediator.send(login("nurse@clinic.org", "Wrong1234")).await;
        let unknown_email = mediator.send(login("ghost@clinic.org", PASSWORD)).await;

        assert_matches!(wrong_password, Err(AppError::Unauthorized(ref msg)) if msg == "Invalid email or password");
        assert_matches!(unknown_email, Err(AppError::Unauthorized(ref msg)) if msg == "Invalid email or password");
    }

    #[tokio::test]
    async fn test_register_rejects_email_wider_than_column() {
        let (mediator, store) = mediator_with_store(TEST_HASH_COST);
        let email = format!("{}@{}.{}.{}.com", "u".repeat(64), "a".repeat(63), "a".repeat(63), "a".repeat(63));

        let result = mediator.send(register(&email)).await;

        assert_matches!(result, Err(AppError::Validation(_)));
        let mut uow = store.begin().await.unwrap();
        assert!(uow.accounts().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_records_last_login() {
        let (mediator, store) = mediator_with_store(TEST_HASH_COST);
        mediator.send(register("nurse@clinic.org")).await.unwrap();
        assert!(stored_account(&store, "nurse@clinic.org").await.last_login.is_none());

        mediator
            .send(login("nurse@clinic.org", PASSWORD))
            .await
            .unwrap();

        let account = stored_account(&store, "nurse@clinic.org").await;
        assert!(account.last_login.is_some());
    }

    #[tokio::test]
    async fn test_inactive_account_gets_generic_message() {
        let (mediator, store) = mediator_with_store(TEST_HASH_COST);
        mediator.send(register("nurse@clinic.org")).await.unwrap();
        deactivate(&store, "nurse@clinic.org").await;

        let result = mediator.send(login("nurse@clinic.org", PASSWORD)).await;

        assert_matches!(result, Err(AppError::Unauthorized(ref msg)) if msg == "Invalid email or password");
        assert!(stored_account(&store, "nurse@clinic.org").await.last_login.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_password_hashing_leaves_store_available() {
        // production cost, slow enough to overlap the read below
        let (mediator, _store) = mediator_with_store(12);
        let registering = tokio::spawn({
            let mediator = mediator.clone();
            async move { mediator.send(register("slow@clinic.org")).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let listed = tokio::time::timeout(Duration::from_millis(500), mediator.send(ListUsers)).await;

        assert!(listed.is_ok(), "store was held while hashing");
        assert!(registering.await.unwrap().is_ok());
    }
}
