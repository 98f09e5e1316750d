use actix_web::{http::StatusCode, test::TestRequest};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use umkm_payment_engine::{
    db_types::{
        LedgerEntryKind,
        MerchantStatus,
        NewWithdrawal,
        Role,
        Rupiah,
        TransactionType,
        WalletTransaction,
        WithdrawRequest,
        WithdrawalStatus,
    },
    traits::PaymentGatewayError,
};

use super::{
    helpers::{accounts, bearer, issue_token, merchant, merchant_lookup, send, wallet, withdrawals},
    mocks::MockLedger,
};

fn minimum() -> Rupiah {
    Rupiah::from_rupiah(10_000)
}

fn withdrawal_request(merchant_id: i64, w: &NewWithdrawal) -> WithdrawRequest {
    WithdrawRequest {
        id: 1,
        merchant_id,
        amount: w.amount,
        bank_name: w.bank_name.clone(),
        bank_account: w.bank_account.clone(),
        status: WithdrawalStatus::Pending,
        created_at: Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
    }
}

#[actix_web::test]
async fn my_wallet() {
    let _ = env_logger::try_init();
    let mut db = merchant_lookup(5, 7);
    db.expect_fetch_wallet_for_merchant().withf(|id| *id == 7).returning(|_| Ok(Some(wallet(7, 50_000, 25_000))));
    let req = TestRequest::get().uri("/api/umkm/wallet").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let w: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(w["balance_pending"], "50000.00");
    assert_eq!(w["balance_available"], "25000.00");
}

#[actix_web::test]
async fn merchants_without_a_wallet() {
    let _ = env_logger::try_init();
    let mut db = merchant_lookup(5, 7);
    db.expect_fetch_wallet_for_merchant().returning(|_| Ok(None));
    let req = TestRequest::get().uri("/api/umkm/wallet").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, _) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut db = merchant_lookup(5, 7);
    db.expect_fetch_wallet_for_merchant().returning(|_| Ok(None));
    let req =
        TestRequest::get().uri("/api/umkm/wallet/transactions").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[actix_web::test]
async fn wallet_transactions() {
    let _ = env_logger::try_init();
    let mut db = merchant_lookup(5, 7);
    db.expect_fetch_wallet_for_merchant().returning(|_| Ok(Some(wallet(7, 50_000, 0))));
    db.expect_fetch_wallet_transactions().withf(|id| *id == 70).returning(|wallet_id| {
        Ok(vec![WalletTransaction {
            id: 1,
            wallet_id,
            tx_type: TransactionType::In,
            kind: LedgerEntryKind::CreditPending,
            amount: Rupiah::from_rupiah(50_000),
            description: "Payment for order 3".to_string(),
            order_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 11, 0, 0).unwrap(),
        }])
    });
    let req =
        TestRequest::get().uri("/api/umkm/wallet/transactions").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let txs: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(txs[0]["type"], "IN");
    assert_eq!(txs[0]["kind"], "CREDIT_PENDING");
    assert_eq!(txs[0]["amount"], "50000.00");
}

#[actix_web::test]
async fn request_withdrawal() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_merchant().returning(|id| Ok(Some(merchant(id, 5, MerchantStatus::Active))));
    db.expect_request_withdrawal()
        .withf(|id, w| *id == 7 && w.amount == Rupiah::from_rupiah(20_000) && w.bank_name == "BCA")
        .times(1)
        .returning(|id, w| Ok((withdrawal_request(id, &w), wallet(id, 20_000, 5_000))));
    let req = TestRequest::post()
        .uri("/api/umkm/withdraw")
        .insert_header(bearer(&issue_token(5, Role::Umkm)))
        .set_json(json!({ "amount": 20000, "bankName": "BCA", "bankAccount": "1234567890" }));
    let (status, body) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        withdrawals(cfg, db, minimum());
    })
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res["request"]["status"], "PENDING");
    assert_eq!(res["request"]["amount"], "20000.00");
    assert_eq!(res["wallet"]["balance_available"], "5000.00");
}

#[actix_web::test]
async fn withdrawals_below_the_minimum() {
    let _ = env_logger::try_init();
    let req = TestRequest::post()
        .uri("/api/umkm/withdraw")
        .insert_header(bearer(&issue_token(5, Role::Umkm)))
        .set_json(json!({ "amount": "9999.99", "bankName": "BCA", "bankAccount": "1234567890" }));
    let (status, body) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        withdrawals(cfg, MockLedger::new(), minimum());
    })
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("below the minimum"), "{body}");
}

#[actix_web::test]
async fn withdrawals_above_the_available_balance() {
    let _ = env_logger::try_init();
    let mut db = MockLedger::new();
    db.expect_fetch_merchant().returning(|id| Ok(Some(merchant(id, 5, MerchantStatus::Active))));
    db.expect_request_withdrawal().returning(|_, w| {
        Err(PaymentGatewayError::InsufficientBalance { wallet_id: 70, required: w.amount })
    });
    let req = TestRequest::post()
        .uri("/api/umkm/withdraw")
        .insert_header(bearer(&issue_token(5, Role::Umkm)))
        .set_json(json!({ "amount": 1000000, "bankName": "BCA", "bankAccount": "1234567890" }));
    let (status, _) = send(req, |cfg| {
        accounts(cfg, merchant_lookup(5, 7));
        withdrawals(cfg, db, minimum());
    })
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[actix_web::test]
async fn my_withdrawals() {
    let _ = env_logger::try_init();
    let mut db = merchant_lookup(5, 7);
    db.expect_fetch_withdrawals_for_merchant().withf(|id| *id == 7).returning(|id| {
        let w = NewWithdrawal::new(Rupiah::from_rupiah(20_000), "BCA", "1234567890");
        Ok(vec![withdrawal_request(id, &w)])
    });
    let req = TestRequest::get().uri("/api/umkm/withdrawals").insert_header(bearer(&issue_token(5, Role::Umkm)));
    let (status, body) = send(req, |cfg| accounts(cfg, db)).await;
    assert_eq!(status, StatusCode::OK);
    let res: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(res[0]["bank_name"], "BCA");
}
