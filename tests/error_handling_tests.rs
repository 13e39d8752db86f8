//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes and error codes
//! - Error bodies carry the details a client needs to rebuild the error
//! - Kinds decide retry and refresh behavior

use axum::http::StatusCode;
use axum::response::IntoResponse;
use dyehouse::core::error::{ErrorResponse, FieldError};
use dyehouse::prelude::*;
use serde_json::Value;

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_validation_errors_return_422() {
        let err = DyehouseError::field("partyName", "Party Name is required");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(DyehouseError::NoItems.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_malformed_input_returns_400() {
        assert_eq!(
            DyehouseError::UnknownStatus("shipped".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        let err: DyehouseError = Uuid::parse_str("nope").unwrap_err().into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[test]
    fn test_state_conflicts_return_409() {
        let id = Uuid::new_v4();
        for err in [
            DyehouseError::DuplicatePendingRequest { order_id: id },
            DyehouseError::InvalidState {
                request_id: id,
                state: "rejected".into(),
            },
            DyehouseError::NoUnusedApprovedRequest { order_id: id },
            DyehouseError::Busy { id },
        ] {
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
            assert_eq!(err.kind(), ErrorKind::StateConflict);
        }
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(
            DyehouseError::not_authenticated("missing bearer token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DyehouseError::not_authorized("sales may not add orders").status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_transient_returns_503() {
        let err = DyehouseError::Transient {
            message: "connection refused".into(),
        };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_internal_returns_500() {
        assert_eq!(
            DyehouseError::Internal("lock poisoned".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod response_tests {
    use super::*;

    async fn body_of(err: DyehouseError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_body_lists_fields() {
        let err = DyehouseError::Validation(vec![
            FieldError::new("date", "Backdating orders is not allowed"),
            FieldError::new("partyName", "Party Name is required"),
        ]);
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["details"]["fields"][0]["field"], "date");
        assert_eq!(body["details"]["fields"][1]["message"], "Party Name is required");
    }

    #[tokio::test]
    async fn test_duplicate_pending_body_carries_order_id() {
        let order_id = Uuid::new_v4();
        let (status, body) = body_of(DyehouseError::DuplicatePendingRequest { order_id }).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "DUPLICATE_PENDING_REQUEST");
        assert_eq!(body["details"]["orderId"], order_id.to_string());
    }

    #[tokio::test]
    async fn test_not_authorized_has_no_details() {
        let (_, body) = body_of(DyehouseError::not_authorized("factory may not delete orders")).await;
        assert_eq!(body["code"], "NOT_AUTHORIZED");
        assert!(body.get("details").is_none());
        assert!(body["message"].as_str().unwrap().contains("factory may not delete orders"));
    }
}

// =============================================================================
// Client-side Rebuild Tests
// =============================================================================

mod from_response_tests {
    use super::*;

    #[test]
    fn test_rebuilds_invalid_state() {
        let request_id = Uuid::new_v4();
        let original = DyehouseError::InvalidState {
            request_id,
            state: "approved".into(),
        };
        match DyehouseError::from_response(409, Some(original.to_response())) {
            DyehouseError::InvalidState { request_id: id, state } => {
                assert_eq!(id, request_id);
                assert_eq!(state, "approved");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rebuilds_validation_fields() {
        let original = DyehouseError::field("salespersonId", "Salesperson is required");
        match DyehouseError::from_response(422, Some(original.to_response())) {
            DyehouseError::Validation(fields) => {
                assert_eq!(fields, vec![FieldError::new("salespersonId", "Salesperson is required")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_body_is_transient_except_auth() {
        assert!(DyehouseError::from_response(502, None).is_retryable());
        assert_eq!(
            DyehouseError::from_response(401, None).kind(),
            ErrorKind::NotAuthenticated
        );
        assert_eq!(DyehouseError::from_response(403, None).kind(), ErrorKind::NotAuthorized);
    }

    #[test]
    fn test_unknown_code_is_transient() {
        let body = ErrorResponse {
            code: "TEAPOT".into(),
            message: "short and stout".into(),
            details: None,
        };
        let err = DyehouseError::from_response(418, Some(body));
        assert!(err.is_retryable());
    }
}

// =============================================================================
// Kind Tests
// =============================================================================

mod kind_tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(
            DyehouseError::Transient {
                message: "timeout".into()
            }
            .is_retryable()
        );
        assert!(!DyehouseError::NoItems.is_retryable());
        assert!(!DyehouseError::not_authorized("no").is_retryable());
        assert!(!DyehouseError::Busy { id: Uuid::nil() }.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let pending = DyehouseError::DuplicatePendingRequest { order_id: Uuid::nil() };
        assert!(pending.user_message().starts_with("Request Pending"));

        let stale = DyehouseError::NoUnusedApprovedRequest { order_id: Uuid::nil() };
        assert!(stale.user_message().ends_with("The list has been refreshed."));

        let offline = DyehouseError::Transient {
            message: "connection refused".into(),
        };
        assert_eq!(offline.user_message(), "Could not reach the server, please try again");
    }

    #[test]
    fn test_no_items_message() {
        assert_eq!(
            DyehouseError::NoItems.to_string(),
            "you must enter at least one denier or one SL number with quantity"
        );
    }
}
