use actix_web::{http::StatusCode, test::TestRequest};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use umkm_payment_engine::{
    db_types::{
        AuditLogEntry,
        Dispute,
        DisputeDecision,
        DisputeStatus,
        MerchantStatus,
        OrderId,
        OrderStatusType,
        Role,
        Rupiah,
    },
    traits::{LedgerMovement, PaymentGatewayError},
};

use super::{
    helpers::{accounts, bearer, disputes, issue_token, merchant, merchants, order, send, wallet},
    mocks::MockLedger,
};

pub fn dispute(id: i64, order_id: OrderId, reason: &str) -> Dispute {
    Dispute {
        id,
        order_id,
        reason: reason.to_string(),
        status: DisputeStatus::Open,
        decision: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap(),
        resolved_at: None,
    }
}

fn resolved(id: i64, decision: DisputeDecision) -> Dispute {
    Dispute {
        status: DisputeStatus::Resolved,
        decision: Some(decision),
        resolved_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap()),
        ..dispute(id, OrderId(3), "Barang rusak")
    }
}

fn admin() -> (&'static str, String) {
    bearer(&issue_token(1, Role::Admin))
}

#[actix_web::test]
async fn only_admins_see_disputes() {
    let _ = env_logger::try_init();
    for role in [Role::User, Role::Umkm] {
        let req = TestRequest::get().uri("/api/admin/disputes").insert_header(bearer(&issue_token(42, role)));
        let (status, _) = send(req, |cfg| disputes(cfg, MockLedger::new())).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{role}");
    }
    let mut db = MockLedger::new();
    db.expect_fetch_open_disputes().returning(|| Ok(vec![dispute(11, OrderId(3), "Barang rusak")]));
    let req = TestRequest::get().uri("/api/admin/disputes").insert_header(admin());
    let (status, body) = send(req, |cfg| disputes(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res[0]["id"], 11);
    assert_eq!(res[0]["order_id"], 3);
}

#[actix_web::test]
async fn resolve_dispute_with_a_refund() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_resolve_dispute()
        .withf(|id, decision| *id == 11 && *decision == DisputeDecision::Refund)
        .times(1)
        .returning(|id, decision| {
            let order = order(3, 42, 7, OrderStatusType::Refunded);
            Ok((resolved(id, decision), LedgerMovement { order, wallet: wallet(7, 0, 0) }))
        });
    let req = TestRequest::patch()
        .uri("/api/admin/disputes/11/resolve")
        .insert_header(admin())
        .set_json(json!({ "decision": "refund" }));
    let (status, body) = send(req, |cfg| disputes(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["status"], "RESOLVED");
    assert_eq!(res["decision"], "REFUND");
}

#[actix_web::test]
async fn unknown_decisions_are_rejected() {
    let _ = env_logger::try_init();
    // The ledger is never consulted
    let req = TestRequest::patch()
        .uri("/api/admin/disputes/11/resolve")
        .insert_header(admin())
        .set_json(json!({ "decision": "SPLIT" }));
    let (status, body) = send(req, |cfg| disputes(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("SPLIT"), "{body}");
}

#[actix_web::test]
async fn resolving_twice_conflicts() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_resolve_dispute().returning(|id, _| Err(PaymentGatewayError::DisputeAlreadyResolved(id)));
    let req = TestRequest::patch()
        .uri("/api/admin/disputes/11/resolve")
        .insert_header(admin())
        .set_json(json!({ "decision": "RELEASE" }));
    let (status, _) = send(req, |cfg| disputes(cfg, db)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut db = MockLedger::new();
    db.expect_resolve_dispute().returning(|id, _| Err(PaymentGatewayError::DisputeNotFound(id)));
    let req = TestRequest::patch()
        .uri("/api/admin/disputes/99/resolve")
        .insert_header(admin())
        .set_json(json!({ "decision": "RELEASE" }));
    let (status, _) = send(req, |cfg| disputes(cfg, db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn refund_after_withdrawal_is_unprocessable() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_resolve_dispute().returning(|_, _| {
        Err(PaymentGatewayError::InsufficientBalance { wallet_id: 70, required: Rupiah::from_rupiah(50_000) })
    });
    let req = TestRequest::patch()
        .uri("/api/admin/disputes/11/resolve")
        .insert_header(admin())
        .set_json(json!({ "decision": "REFUND" }));
    let (status, _) = send(req, |cfg| disputes(cfg, db)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn merchant_approval() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_pending_merchants().returning(|| Ok(vec![merchant(7, 5, MerchantStatus::Pending)]));
    let req = TestRequest::get().uri("/api/admin/umkm/pending").insert_header(admin());
    let (status, body) = send(req, |cfg| merchants(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res[0]["status"], "PENDING");

    let mut db = MockLedger::new();
    db.expect_approve_merchant()
        .withf(|id| *id == 7)
        .times(1)
        .returning(|id| Ok((merchant(id, 5, MerchantStatus::Active), wallet(id, 0, 0))));
    let req = TestRequest::patch().uri("/api/admin/umkm/7/approve").insert_header(admin());
    let (status, body) = send(req, |cfg| merchants(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["status"], "ACTIVE");

    let mut db = MockLedger::new();
    db.expect_approve_merchant().returning(|id| Err(PaymentGatewayError::MerchantNotFound(id)));
    let req = TestRequest::patch().uri("/api/admin/umkm/8/approve").insert_header(admin());
    let (status, _) = send(req, |cfg| merchants(cfg, db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn merchant_rejection() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_reject_merchant()
        .withf(|id, reason| *id == 7 && reason.to_string() == "KTP tidak terbaca")
        .times(1)
        .returning(|id, reason| {
            let mut m = merchant(id, 5, MerchantStatus::Rejected);
            m.rejection_reason = Some(reason.to_string());
            Ok(m)
        });
    let req = TestRequest::patch()
        .uri("/api/admin/umkm/7/reject")
        .insert_header(admin())
        .set_json(json!({ "reason": " KTP tidak terbaca " }));
    let (status, body) = send(req, |cfg| merchants(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["rejection_reason"], "KTP tidak terbaca");
}

#[actix_web::test]
async fn audit_logs_are_clamped() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_audit_logs().withf(|limit| *limit == 500).times(1).returning(|_| {
        Ok(vec![AuditLogEntry {
            id: 1,
            admin_id: 1,
            action: "APPROVE_UMKM".to_string(),
            target_type: "UMKM".to_string(),
            target_id: 7,
            metadata: Some(r#"{"wallet_id":70}"#.to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }])
    });
    let req = TestRequest::get().uri("/api/admin/audit-logs?limit=10000").insert_header(admin());
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res[0]["action"], "APPROVE_UMKM");

    let req = TestRequest::get().uri("/api/admin/audit-logs?limit=ten").insert_header(admin());
    let (status, _) = send(req, |cfg| accounts(cfg, MockLedger::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
