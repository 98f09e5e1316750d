use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::Value;
use umkm_payment_engine::{
    db_types::{MerchantStatus, OrderId, OrderStatusType, Role},
    order_state::OrderTransition,
    traits::{LedgerMovement, PaymentGatewayError},
};

use super::{
    helpers::{accounts, bearer, issue_token, merchant, merchant_lookup, order, order_flow, send, wallet},
    mocks::MockLedger,
};

#[actix_web::test]
async fn my_orders_without_a_token() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/api/orders/my");
    let (status, body) = send(req, |cfg| accounts(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token was provided"), "{body}");
}

#[actix_web::test]
async fn my_orders_with_a_bad_token() {
    let _ = env_logger::try_init();
    let mut token = issue_token(42, Role::User);
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let req = TestRequest::get().uri("/api/orders/my").insert_header(bearer(&token));
    let (status, _) = send(req, |cfg| accounts(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::get().uri("/api/orders/my").insert_header(("Authorization", "Basic dXNlcjpwYXNz"));
    let (status, _) = send(req, |cfg| accounts(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn my_orders() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_orders_for_buyer().withf(|id| *id == 42).times(1).returning(|_| {
        Ok(vec![order(2, 42, 7, OrderStatusType::Shipped), order(1, 42, 8, OrderStatusType::Completed)])
    });
    let req = TestRequest::get().uri("/api/orders/my").insert_header(bearer(&issue_token(42, Role::User)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders[0]["id"], 2);
    assert_eq!(orders[0]["order_status"], "SHIPPED");
    assert_eq!(orders[0]["total_amount"], "50000.00");
    assert_eq!(orders[1]["id"], 1);
}

#[actix_web::test]
async fn incoming_orders_need_a_merchant_account() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/api/orders/incoming").insert_header(bearer(&issue_token(42, Role::User)));
    let (status, _) = send(req, |cfg| accounts(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut db = MockLedger::new();
    db.expect_fetch_merchant_for_user().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/orders/incoming").insert_header(bearer(&issue_token(42, Role::Umkm)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("merchant profile"), "{body}");
}

#[actix_web::test]
async fn incoming_orders() {
    let _ = env_logger::try_init();
    let mut db = merchant_lookup(5, 7);
    db.expect_fetch_orders_for_merchant()
        .withf(|id| *id == 7)
        .returning(|_| Ok(vec![order(3, 42, 7, OrderStatusType::Pending)]));
    let req = TestRequest::get().uri("/api/orders/incoming").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["merchant_id"], 7);
}

fn order_details_ledger() -> MockLedger {
    let mut db = MockLedger::new();
    db.expect_fetch_order()
        .withf(|id| *id == OrderId(3))
        .returning(|_| Ok(Some(order(3, 42, 7, OrderStatusType::Shipped))));
    db.expect_fetch_payment_for_order().returning(|_| Ok(None));
    db.expect_fetch_order_status_log().returning(|_| Ok(vec![]));
    db
}

#[actix_web::test]
async fn order_by_id_for_the_buyer_and_admins() {
    let _ = env_logger::try_init();
    for (user, role) in [(42, Role::User), (1, Role::Admin)] {
        let req = TestRequest::get().uri("/api/orders/3").insert_header(bearer(&issue_token(user, role)));
        let (status, body) = send(req, |cfg| accounts(cfg, order_details_ledger())).await;
        assert_eq!(status, StatusCode::OK, "{role}");
        let details: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(details["order"]["id"], 3);
        assert!(details["payment"].is_null());
    }
}

#[actix_web::test]
async fn order_by_id_for_the_owning_merchant() {
    let _ = env_logger::try_init();
    let mut db = order_details_ledger();
    db.expect_fetch_merchant_for_user()
        .withf(|id| *id == 5)
        .returning(|_| Ok(Some(merchant(7, 5, MerchantStatus::Active))));
    let req = TestRequest::get().uri("/api/orders/3").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, _) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn other_peoples_orders_are_not_found() {
    let _ = env_logger::try_init();
    let mut db = order_details_ledger();
    db.expect_fetch_merchant_for_user().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/orders/3").insert_header(bearer(&issue_token(99, Role::User)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Order #3 does not exist"), "{body}");
}

#[actix_web::test]
async fn order_by_id_with_a_bad_path() {
    let _ = env_logger::try_init();
    let req = TestRequest::get().uri("/api/orders/abc").insert_header(bearer(&issue_token(42, Role::User)));
    let (status, _) = send(req, |cfg| accounts(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn ship_order_with_tracking_number() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_ship_order()
        .withf(|merchant, id, tracking| *merchant == 7 && *id == OrderId(3) && tracking.as_deref() == Some("JNE123"))
        .times(1)
        .returning(|_, _, tracking| {
            let mut o = order(3, 42, 7, OrderStatusType::Shipped);
            o.tracking_number = tracking;
            Ok(o)
        });
    let req = TestRequest::patch()
        .uri("/api/orders/3/ship")
        .insert_header(bearer(&issue_token(5, Role::Umkm)))
        .set_json(serde_json::json!({ "trackingNumber": " JNE123 " }));
    let (status, body) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        order_flow(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let shipped: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(shipped["order_status"], "SHIPPED");
    assert_eq!(shipped["tracking_number"], "JNE123");
}

#[actix_web::test]
async fn ship_order_without_a_body() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_ship_order()
        .withf(|_, _, tracking| tracking.is_none())
        .times(1)
        .returning(|_, _, _| Ok(order(3, 42, 7, OrderStatusType::Shipped)));
    let req = TestRequest::patch().uri("/api/orders/3/ship").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, _) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        order_flow(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn shipping_an_unpaid_order_conflicts() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_ship_order().returning(|_, _, _| {
        let unpaid = order(3, 42, 7, OrderStatusType::Pending);
        Err(PaymentGatewayError::InvalidTransition(OrderTransition::Ship.check(&unpaid).unwrap_err()))
    });
    let req = TestRequest::patch().uri("/api/orders/3/ship").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, _) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        order_flow(cfg, db);
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn buyers_cannot_ship() {
    let _ = env_logger::try_init();
    let req = TestRequest::patch().uri("/api/orders/3/ship").insert_header(bearer(&issue_token(42, Role::User)));
    let (status, _) = send(req, |cfg| {
        accounts(cfg, MockLedger::new());
        order_flow(cfg, MockLedger::new());
    })
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn update_tracking_needs_a_tracking_number() {
    let _ = env_logger::try_init();
    let token = issue_token(5, Role::Umkm);
    let req = TestRequest::patch()
        .uri("/api/orders/3/tracking")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "trackingNumber": "   " }));
    let (status, _) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        order_flow(cfg, MockLedger::new());
    })
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let req = TestRequest::patch()
        .uri("/api/orders/3/tracking")
        .insert_header(bearer(&token))
        .set_json(serde_json::json!({ "tracking": "JNE123" }));
    let (status, body) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        order_flow(cfg, MockLedger::new());
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("\"error\""), "{body}");
}

#[actix_web::test]
async fn complete_order() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_complete_order().withf(|buyer, id| *buyer == 42 && *id == OrderId(3)).times(1).returning(|_, _| {
        Ok(LedgerMovement { order: order(3, 42, 7, OrderStatusType::Completed), wallet: wallet(7, 0, 50_000) })
    });
    let req = TestRequest::patch().uri("/api/orders/3/complete").insert_header(bearer(&issue_token(42, Role::User)));
    let (status, body) = send(req, |cfg| order_flow(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let completed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(completed["order_status"], "COMPLETED");
}

#[actix_web::test]
async fn completing_someone_elses_order() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_complete_order().returning(|_, id| Err(PaymentGatewayError::OrderNotFound(id)));
    let req = TestRequest::patch().uri("/api/orders/3/complete").insert_header(bearer(&issue_token(99, Role::User)));
    let (status, _) = send(req, |cfg| order_flow(cfg, db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn open_dispute() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_open_dispute()
        .withf(|buyer, id, reason| *buyer == 42 && *id == OrderId(3) && reason.to_string() == "Barang rusak")
        .times(1)
        .returning(|_, id, reason| Ok(super::admin::dispute(11, id, reason)));
    let req = TestRequest::post()
        .uri("/api/orders/3/dispute")
        .insert_header(bearer(&issue_token(42, Role::User)))
        .set_json(serde_json::json!({ "reason": "Barang rusak" }));
    let (status, body) = send(req, |cfg| order_flow(cfg, db)).await;
    assert_eq!(status, StatusCode::CREATED);
    let dispute: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(dispute["id"], 11);
    assert_eq!(dispute["status"], "OPEN");
}

#[actix_web::test]
async fn a_second_dispute_conflicts() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_open_dispute().returning(|_, id, _| Err(PaymentGatewayError::DisputeAlreadyExists(id)));
    let req = TestRequest::post()
        .uri("/api/orders/3/dispute")
        .insert_header(bearer(&issue_token(42, Role::User)))
        .set_json(serde_json::json!({ "reason": "Masih rusak" }));
    let (status, _) = send(req, |cfg| order_flow(cfg, db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}
