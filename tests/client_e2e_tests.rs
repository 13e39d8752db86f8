//! End-to-end tests: the HTTP client against a live server
//!
//! These tests verify the complete flow from client call to typed result,
//! including errors rebuilt from response bodies and the board over HTTP.

mod common;

use common::*;
use dyehouse::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct Live {
    client: Arc<HttpBackend>,
    _shutdown: oneshot::Sender<()>,
}

async fn live() -> Live {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        ServerBuilder::new()
            .with_store(seeded_store())
            .serve_listener(listener, async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    let client = HttpBackend::new(format!("http://{}/api", addr), Duration::from_secs(5)).unwrap();
    Live {
        client: Arc::new(client),
        _shutdown: tx,
    }
}

async fn sign_in(client: &HttpBackend, username: &str) -> Session {
    client
        .login(&LoginRequest {
            username: username.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_and_me() {
    let live = live().await;
    let session = sign_in(&live.client, "olivia").await;
    assert_eq!(session.role(), Role::Operator);

    let me = live.client.me(&session).await.unwrap();
    assert_eq!(me.id, session.user_id());
}

#[tokio::test]
async fn test_logout_over_http() {
    let live = live().await;
    let session = sign_in(&live.client, "frank").await;

    live.client.logout(&session).await.unwrap();
    let err = live.client.me(&session).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
}

#[tokio::test]
async fn test_rejected_credentials_are_typed() {
    let live = live().await;
    let err = live
        .client
        .login(&LoginRequest {
            username: "olivia".into(),
            password: "wrong".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_order_lifecycle_over_http() {
    let live = live().await;
    let operator = sign_in(&live.client, "olivia").await;
    let factory = sign_in(&live.client, "frank").await;
    let admin = sign_in(&live.client, "admin").await;
    let sales = sign_in(&live.client, "sue").await;

    let order = live
        .client
        .create_order(&operator, &draft_for(&sales))
        .await
        .unwrap();
    assert_eq!(order.items()[0].status, Status::Received);

    let item = live
        .client
        .update_item_status(&operator, &order.items()[0].id, Status::Dyeing)
        .await
        .unwrap();
    assert_eq!(item.status, Status::Dyeing);
    assert_eq!(item.history().len(), 2);

    let history = live
        .client
        .item_history(&sales, &order.items()[0].id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);

    let filter = OrderFilter {
        status: Some(Status::Dyeing),
        ..Default::default()
    };
    assert_eq!(live.client.list_orders(&admin, &filter).await.unwrap().len(), 1);
    let summary = live.client.order_summary(&admin, &OrderFilter::default()).await.unwrap();
    assert_eq!(summary.total, 1);

    // Change request cycle
    let request = live.client.request_change(&factory, &order.id).await.unwrap();
    let err = live
        .client
        .request_change(&operator, &order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DyehouseError::DuplicatePendingRequest { order_id } if order_id == order.id));

    live.client
        .process_change_request(&admin, &request.id, Decision::Approved, Some("ok".into()))
        .await
        .unwrap();
    let err = live
        .client
        .process_change_request(&admin, &request.id, Decision::Rejected, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DyehouseError::InvalidState { request_id, .. } if request_id == request.id));

    let pending = live
        .client
        .list_change_requests(&admin, &ChangeRequestQuery::pending())
        .await
        .unwrap();
    assert!(pending.is_empty());

    live.client.delete_order(&admin, &order.id).await.unwrap();
    let err = live.client.get_order(&admin, &order.id).await.unwrap_err();
    assert!(matches!(err, DyehouseError::NotFound { .. }));
}

#[tokio::test]
async fn test_validation_errors_keep_fields() {
    let live = live().await;
    let operator = sign_in(&live.client, "olivia").await;
    let sales = sign_in(&live.client, "sue").await;

    let mut draft = draft_for(&sales);
    draft.date = today().pred_opt();
    match live.client.create_order(&operator, &draft).await {
        Err(DyehouseError::Validation(fields)) => assert_eq!(fields[0].field, "date"),
        other => panic!("expected a validation error, got {:?}", other),
    }

    let err = live
        .client
        .create_order(&operator, &OrderDraft::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DyehouseError::NoItems));
}

#[tokio::test]
async fn test_deleted_user_token_stops_working() {
    let live = live().await;
    let admin = sign_in(&live.client, "admin").await;
    let factory = sign_in(&live.client, "frank").await;

    live.client.delete_user(&admin, &factory.user_id()).await.unwrap();
    let err = live.client.me(&factory).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);

    let users = live.client.list_users(&admin).await.unwrap();
    assert!(users.iter().all(|u| u.id != factory.user_id()));
}

#[tokio::test]
async fn test_board_over_http() {
    let live = live().await;
    let operator = sign_in(&live.client, "olivia").await;
    let admin = sign_in(&live.client, "admin").await;
    let sales = sign_in(&live.client, "sue").await;

    let operator_board = OrderBoard::new(live.client.clone(), operator);
    let admin_board = OrderBoard::new(live.client.clone(), admin);

    let order = operator_board.create_order(&draft_for(&sales)).await.unwrap();
    assert_eq!(operator_board.edit_route(&order.id), EditRoute::RequestChange);

    let RequestOutcome::Created(request) = operator_board.request_change(&order.id).await.unwrap() else {
        panic!("expected a new request");
    };
    assert_eq!(operator_board.edit_route(&order.id), EditRoute::AwaitingApproval);

    admin_board.refresh().await.unwrap();
    admin_board
        .process(&request.id, Decision::Approved, None)
        .await
        .unwrap();

    operator_board.refresh().await.unwrap();
    assert_eq!(
        operator_board.edit_route(&order.id),
        EditRoute::ChangeRequest(request.id)
    );

    let patch = OrderPatch {
        party_name: Some("new party".into()),
        ..Default::default()
    };
    let edited = operator_board.submit_edit(&order.id, patch).await.unwrap();
    assert_eq!(edited.party_name, "NEW PARTY");
    assert_eq!(operator_board.edit_route(&order.id), EditRoute::RequestChange);
}
