use assert_matches::assert_matches;

use vaccine_card::handlers::{
    CreateVaccine, DeleteVaccine, GetVaccineById, ListVaccines, UpdateVaccine,
};
use vaccine_card::models::{CreateVaccineRequest, UpdateVaccineRequest};
use vaccine_card::AppError;

use crate::common::{create_vaccine, test_mediator};

fn field_errors(result: Result<impl std::fmt::Debug, AppError>) -> Vec<(Option<String>, String)> {
    match result {
        Err(AppError::Validation(errors)) => errors
            .into_iter()
            .map(|e| (e.field, e.message))
            .collect(),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[cfg(test)]
mod vaccine_handler_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_and_fetch_vaccine() {
        let mediator = test_mediator();
        let created = create_vaccine(&mediator, "HEPB", 3, Some(0), Some(120)).await;

        let fetched = mediator
            .send(GetVaccineById { id: created.id })
            .await
            .unwrap();
        assert_eq!(fetched.code, "HEPB");
        assert_eq!(fetched.doses, 3);
        assert_eq!(fetched.minimum_age, Some(0));
        assert_eq!(fetched.maximum_age, Some(120));
    }

    #[tokio::test]
    async fn test_duplicate_code_on_create() {
        let mediator = test_mediator();
        create_vaccine(&mediator, "FLU1", 1, None, None).await;

        let result = mediator
            .send(CreateVaccine(CreateVaccineRequest {
                name: "Another flu".to_string(),
                code: "FLU1".to_string(),
                doses: 1,
                minimum_age: None,
                maximum_age: None,
            }))
            .await;

        assert_eq!(
            field_errors(result),
            vec![(
                Some("code".to_string()),
                "A vaccine with code FLU1 already exists.".to_string()
            )]
        );
        assert_eq!(mediator.send(ListVaccines).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inverted_age_window_on_create() {
        let mediator = test_mediator();

        let result = mediator
            .send(CreateVaccine(CreateVaccineRequest {
                name: "Odd window".to_string(),
                code: "ODD".to_string(),
                doses: 1,
                minimum_age: Some(30),
                maximum_age: Some(10),
            }))
            .await;

        let errors = field_errors(result);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0.as_deref(), Some("minimumAge"));
    }

    #[tokio::test]
    async fn test_partial_update_merges_fields() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "MMR", 2, Some(1), None).await;

        let updated = mediator
            .send(UpdateVaccine {
                id: vaccine.id,
                changes: UpdateVaccineRequest {
                    doses: Some(3),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(updated.doses, 3);
        assert_eq!(updated.code, "MMR");
        assert_eq!(updated.name, vaccine.name);
        assert_eq!(updated.minimum_age, Some(1));
    }

    #[tokio::test]
    async fn test_update_checks_window_after_merge() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "HPV", 2, Some(9), Some(26)).await;

        let result = mediator
            .send(UpdateVaccine {
                id: vaccine.id,
                changes: UpdateVaccineRequest {
                    minimum_age: Some(30),
                    ..Default::default()
                },
            })
            .await;
        assert_matches!(result, Err(AppError::Validation(_)));

        let unchanged = mediator
            .send(GetVaccineById { id: vaccine.id })
            .await
            .unwrap();
        assert_eq!(unchanged.minimum_age, Some(9));
    }

    #[tokio::test]
    async fn test_update_to_taken_code() {
        let mediator = test_mediator();
        create_vaccine(&mediator, "FLU1", 1, None, None).await;
        let other = create_vaccine(&mediator, "FLU2", 1, None, None).await;

        let result = mediator
            .send(UpdateVaccine {
                id: other.id,
                changes: UpdateVaccineRequest {
                    code: Some("FLU1".to_string()),
                    ..Default::default()
                },
            })
            .await;
        assert_eq!(
            field_errors(result),
            vec![(
                Some("code".to_string()),
                "A vaccine with code FLU1 already exists.".to_string()
            )]
        );

        // keeping its own code is not a conflict
        let result = mediator
            .send(UpdateVaccine {
                id: other.id,
                changes: UpdateVaccineRequest {
                    code: Some("FLU2".to_string()),
                    ..Default::default()
                },
            })
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let mediator = test_mediator();
        let vaccine = create_vaccine(&mediator, "BCG", 1, None, None).await;

        let result = mediator
            .send(UpdateVaccine {
                id: vaccine.id,
                changes: UpdateVaccineRequest::default(),
            })
            .await;
        assert_eq!(
            field_errors(result),
            vec![(
                None,
                "At least one field must be provided for update.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_missing_vaccine() {
        let mediator = test_mediator();

        assert_matches!(
            mediator.send(GetVaccineById { id: 0 }).await,
            Err(AppError::NotFound(msg)) if msg == "Vaccine with id 0 not found."
        );
        assert_matches!(
            mediator.send(GetVaccineById { id: 7 }).await,
            Err(AppError::NotFound(_))
        );
        assert_matches!(
            mediator.send(DeleteVaccine { id: 7 }).await,
            Err(AppError::NotFound(_))
        );
        assert_matches!(
            mediator
                .send(UpdateVaccine {
                    id: 7,
                    changes: UpdateVaccineRequest {
                        doses: Some(2),
                        ..Default::default()
                    },
                })
                .await,
            Err(AppError::NotFound(_))
        );
    }
}
