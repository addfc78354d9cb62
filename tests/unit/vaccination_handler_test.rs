use assert_matches::assert_matches;
use chrono::Duration;

use vaccine_card::handlers::{
    CreateVaccination, DeleteUser, DeleteVaccination, DeleteVaccine, GetUserById,
    UpdateVaccination,
};
use vaccine_card::models::{CreateVaccinationRequest, UpdateVaccinationRequest};
use vaccine_card::AppError;

use crate::common::{create_user, create_vaccine, days_ago, test_mediator};

fn dose(vaccine_id: i32, dose: i32) -> CreateVaccinationRequest {
    CreateVaccinationRequest {
        vaccine_id,
        vaccination_date: Some(days_ago(1)),
        dose,
    }
}

fn expect_rule(result: Result<impl std::fmt::Debug, AppError>, message: &str) {
    match result {
        Err(err @ AppError::Validation(_)) => assert_eq!(err.to_string(), message),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[cfg(test)]
mod vaccination_handler_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_dose_sequence_for_open_vaccine() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let user = create_user(&mediator, "Ana Souza", 20).await;

        let first = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .unwrap();
        assert_eq!(first.dose, 1);
        assert_eq!(first.vaccine, "Vaccine FLU1");
        assert_eq!(first.user_id, user.id);

        let repeated = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await;
        expect_rule(
            repeated,
            "User already has taken the dose 1 of the vaccine Vaccine FLU1.",
        );

        let beyond = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 3),
            })
            .await;
        expect_rule(
            beyond,
            "User has already taken all doses of the vaccine Vaccine FLU1. Total doses: 2",
        );

        let second = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 2),
            })
            .await
            .unwrap();
        assert_eq!(second.dose, 2);

        let card = mediator.send(GetUserById { id: user.id }).await.unwrap();
        assert_eq!(card.vaccinations.map(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn test_age_window_is_enforced() {
        let mediator = test_mediator();
        let adults_only = create_vaccine(&mediator, "ADULT", 1, Some(18), None).await;
        let children_only = create_vaccine(&mediator, "KIDS", 1, None, Some(10)).await;
        let teen = create_user(&mediator, "Teen Ager", 17).await;
        let adult = create_user(&mediator, "Grown Up", 20).await;

        let result = mediator
            .send(CreateVaccination {
                user_id: teen.id,
                payload: dose(adults_only.id, 1),
            })
            .await;
        expect_rule(result, "User is not eligible to take the vaccine Vaccine ADULT.");

        let result = mediator
            .send(CreateVaccination {
                user_id: adult.id,
                payload: dose(children_only.id, 1),
            })
            .await;
        expect_rule(result, "User is not eligible to take the vaccine Vaccine KIDS.");

        assert!(mediator
            .send(CreateVaccination {
                user_id: adult.id,
                payload: dose(adults_only.id, 1),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_exact_boundary_ages_are_eligible() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "BOUND", 1, Some(18), Some(18)).await;
        let user = create_user(&mediator, "Just Eighteen", 18).await;

        assert!(mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_sentinel_and_missing_references() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let user = create_user(&mediator, "Ana Souza", 20).await;

        let result = mediator
            .send(CreateVaccination {
                user_id: 0,
                payload: dose(vaccine.id, 1),
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(msg)) if msg == "User with id 0 not found.");

        let result = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(0, 1),
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(msg)) if msg == "Vaccine with id 0 not found.");

        let result = mediator
            .send(CreateVaccination {
                user_id: 999,
                payload: dose(vaccine.id, 1),
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(_)));

        let result = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(999, 1),
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected_before_lookup() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let user = create_user(&mediator, "Ana Souza", 20).await;

        let future = CreateVaccinationRequest {
            vaccination_date: Some(chrono::Utc::now() + Duration::days(3)),
            ..dose(vaccine.id, 1)
        };
        let result = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: future,
            })
            .await;
        assert_matches!(result, Err(AppError::Validation(_)));

        // validation runs before the user lookup
        let result = mediator
            .send(CreateVaccination {
                user_id: 999,
                payload: dose(vaccine.id, 0),
            })
            .await;
        assert_matches!(result, Err(AppError::Validation(_)));

        let card = mediator.send(GetUserById { id: user.id }).await.unwrap();
        assert_eq!(card.vaccinations.map(|v| v.len()), Some(0));
    }

    #[tokio::test]
    async fn test_update_vaccination_date() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let user = create_user(&mediator, "Ana Souza", 20).await;
        let recorded = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .unwrap();

        let new_date = days_ago(10);
        let updated = mediator
            .send(UpdateVaccination {
                user_id: user.id,
                vaccination_id: recorded.id,
                changes: UpdateVaccinationRequest {
                    vaccination_date: Some(new_date),
                },
            })
            .await
            .unwrap();

        assert_eq!(updated.vaccination_date, new_date);
        assert_eq!(updated.dose, 1);
        assert_eq!(updated.vaccine, "Vaccine FLU1");

        let empty = mediator
            .send(UpdateVaccination {
                user_id: user.id,
                vaccination_id: recorded.id,
                changes: UpdateVaccinationRequest::default(),
            })
            .await;
        assert_matches!(empty, Err(AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_vaccination_must_belong_to_user() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let owner = create_user(&mediator, "Ana Souza", 20).await;
        let stranger = create_user(&mediator, "Bia Lima", 30).await;
        let recorded = mediator
            .send(CreateVaccination {
                user_id: owner.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .unwrap();

        let result = mediator
            .send(UpdateVaccination {
                user_id: stranger.id,
                vaccination_id: recorded.id,
                changes: UpdateVaccinationRequest {
                    vaccination_date: Some(days_ago(2)),
                },
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(_)));

        let result = mediator
            .send(DeleteVaccination {
                user_id: stranger.id,
                vaccination_id: recorded.id,
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_vaccination() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let user = create_user(&mediator, "Ana Souza", 20).await;
        let recorded = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .unwrap();

        let delete = DeleteVaccination {
            user_id: user.id,
            vaccination_id: recorded.id,
        };
        mediator.send(delete).await.unwrap();
        assert_matches!(mediator.send(delete).await, Err(AppError::NotFound(_)));

        assert_matches!(
            mediator
                .send(DeleteVaccination {
                    user_id: user.id,
                    vaccination_id: 0,
                })
                .await,
            Err(AppError::NotFound(_))
        );

        // the freed dose can be recorded again
        assert!(mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_deleting_vaccine_or_user_removes_vaccinations() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "FLU1", 2, None, None).await;
        let user = create_user(&mediator, "Ana Souza", 20).await;
        let recorded = mediator
            .send(CreateVaccination {
                user_id: user.id,
                payload: dose(vaccine.id, 1),
            })
            .await
            .unwrap();

        mediator.send(DeleteVaccine { id: vaccine.id }).await.unwrap();
        let card = mediator.send(GetUserById { id: user.id }).await.unwrap();
        assert_eq!(card.vaccinations.map(|v| v.len()), Some(0));

        mediator.send(DeleteUser { id: user.id }).await.unwrap();
        let result = mediator
            .send(DeleteVaccination {
                user_id: user.id,
                vaccination_id: recorded.id,
            })
            .await;
        assert_matches!(result, Err(AppError::NotFound(_)));
    }
}
