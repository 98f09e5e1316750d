use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use serde_json::{json, Value};
use umkm_common::Secret;
use umkm_payment_engine::{
    db_types::{OrderId, OrderStatusType},
    events::EventProducers,
    helpers::callback_signature,
    traits::{OrderPaymentOutcome, PaymentGatewayError},
    ReconciliationApi,
};

use super::{
    helpers::{order, send},
    mocks::MockLedger,
};

const SERVER_KEY: &str = "SB-Mid-server-endpoint-tests";

fn reconciliation(cfg: &mut ServiceConfig, db: MockLedger) {
    let api = ReconciliationApi::new(db, EventProducers::default(), Secret::new(SERVER_KEY.to_string()));
    cfg.app_data(web::Data::new(api));
}

fn notification(status: &str, custom_field1: &str, key: &str) -> Value {
    let trx = "TRX-1709370000000-42";
    json!({
        "order_id": trx,
        "status_code": "200",
        "gross_amount": "50000.00",
        "signature_key": callback_signature(trx, "200", "50000.00", key),
        "transaction_status": status,
        "custom_field1": custom_field1,
        "payment_type": "bank_transfer",
    })
}

fn post(body: Value) -> TestRequest {
    TestRequest::post().uri("/midtrans/callback").set_json(body)
}

fn paid_order_ledger() -> MockLedger {
    let mut db = MockLedger::new();
    db.expect_fetch_orders()
        .returning(|ids| Ok(ids.iter().map(|id| order(id.value(), 42, 7, OrderStatusType::Pending)).collect()));
    db
}

#[actix_web::test]
async fn settlement_is_acknowledged() {
    let _ = env_logger::try_init();
    let mut db = paid_order_ledger();
    db.expect_apply_settlement()
        .withf(|id, trx| *id == OrderId(3) && trx.to_string() == "TRX-1709370000000-42")
        .times(1)
        .returning(|id, _| Ok(OrderPaymentOutcome::AlreadyPaid(order(id.value(), 42, 7, OrderStatusType::Pending))));
    let (status, body) = send(post(notification("settlement", "[3]", SERVER_KEY)), |cfg| reconciliation(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["success"], true);
}

#[actix_web::test]
async fn pending_transactions_do_not_touch_the_ledger() {
    let _ = env_logger::try_init();
    // No expectations: any call into the ledger fails the test
    let (status, _) =
        send(post(notification("pending", "[3]", SERVER_KEY)), |cfg| reconciliation(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn invalid_signature_is_forbidden() {
    let _ = env_logger::try_init();
    let (status, body) =
        send(post(notification("settlement", "[3]", "not-the-key")), |cfg| reconciliation(cfg, MockLedger::new()))
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["success"], false);
}

#[actix_web::test]
async fn malformed_order_ids_are_a_bad_request() {
    let _ = env_logger::try_init();
    let (status, _) =
        send(post(notification("settlement", "[3, \"x\"]", SERVER_KEY)), |cfg| reconciliation(cfg, MockLedger::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unreadable_body_is_a_bad_request() {
    let _ = env_logger::try_init();
    let req = TestRequest::post().uri("/midtrans/callback").set_payload("order_id=TRX-1");
    let (status, _) = send(req, |cfg| reconciliation(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn fractional_gross_amount_is_a_bad_request() {
    let _ = env_logger::try_init();
    let mut body = notification("settlement", "[3]", SERVER_KEY);
    body["gross_amount"] = json!(50000.0);
    let (status, _) = send(post(body), |cfg| reconciliation(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_orders().returning(|_| Ok(vec![]));
    let (status, _) = send(post(notification("settlement", "[404]", SERVER_KEY)), |cfg| reconciliation(cfg, db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn database_failures_ask_for_a_retry() {
    let _ = env_logger::try_init();
    let mut db = paid_order_ledger();
    db.expect_apply_settlement()
        .returning(|_, _| Err(PaymentGatewayError::DatabaseError("database is locked".to_string())));
    let (status, body) = send(post(notification("settlement", "[3]", SERVER_KEY)), |cfg| reconciliation(cfg, db)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["success"], false);
}

#[actix_web::test]
async fn expired_transactions_fail_every_order() {
    let _ = env_logger::try_init();
    let mut db = paid_order_ledger();
    db.expect_apply_payment_failure().times(2).returning(|id| {
        Ok(OrderPaymentOutcome::MarkedFailed(order(id.value(), 42, 7, OrderStatusType::Cancelled)))
    });
    let (status, _) = send(post(notification("expire", "[3, 4]", SERVER_KEY)), |cfg| reconciliation(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
}
