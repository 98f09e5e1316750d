use std::time::Duration;

use actix_web::{http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use umkm_payment_engine::{
    db_types::{
        Merchant,
        MerchantStatus,
        Order,
        OrderId,
        OrderStatusType,
        PaymentStatus,
        Role,
        Rupiah,
        Wallet,
    },
    events::EventProducers,
    AccountApi,
    DisputeApi,
    MerchantApi,
    OrderFlowApi,
    WithdrawalApi,
};

use super::mocks::MockLedger;
use crate::{
    auth::{JwtClaims, TokenIssuer, TokenVerifier},
    config::AuthConfig,
    middleware::JwtMiddlewareFactory,
    server::{api_scope, json_config, midtrans_scope, path_config, query_config},
};

// DO NOT re-use this secret anywhere.
const TEST_JWT_SECRET: &str = "endpoint-tests-only-3f9a1c27b6e84d05";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET)
}

pub fn issue_token(user_id: i64, role: Role) -> String {
    let claims = JwtClaims::new(user_id, role, Duration::from_secs(600));
    TokenIssuer::new(&get_auth_config()).issue_token(&claims).expect("Failed to sign token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Sends `req` to an app with every route mounted, the same way the server does. `configure` supplies the API data
/// for the handlers under test.
pub async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let verifier = TokenVerifier::new(&get_auth_config());
    let app = App::new()
        .app_data(json_config())
        .app_data(path_config())
        .app_data(query_config())
        .configure(configure)
        .service(api_scope::<MockLedger>().wrap(JwtMiddlewareFactory::new(verifier)))
        .service(midtrans_scope::<MockLedger>());
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn accounts(cfg: &mut ServiceConfig, db: MockLedger) {
    cfg.app_data(web::Data::new(AccountApi::new(db)));
}

pub fn order_flow(cfg: &mut ServiceConfig, db: MockLedger) {
    cfg.app_data(web::Data::new(OrderFlowApi::new(db, EventProducers::default())));
}

pub fn disputes(cfg: &mut ServiceConfig, db: MockLedger) {
    cfg.app_data(web::Data::new(DisputeApi::new(db, EventProducers::default())));
}

pub fn withdrawals(cfg: &mut ServiceConfig, db: MockLedger, minimum: Rupiah) {
    cfg.app_data(web::Data::new(WithdrawalApi::new(db, EventProducers::default(), minimum)));
}

pub fn merchants(cfg: &mut ServiceConfig, db: MockLedger) {
    cfg.app_data(web::Data::new(MerchantApi::new(db, EventProducers::default())));
}

/// A ledger whose only expectation is that user `user_id` owns merchant `merchant_id`.
pub fn merchant_lookup(user_id: i64, merchant_id: i64) -> MockLedger {
    let mut db = MockLedger::new();
    db.expect_fetch_merchant_for_user()
        .withf(move |id| *id == user_id)
        .returning(move |_| Ok(Some(merchant(merchant_id, user_id, MerchantStatus::Active))));
    db
}

pub fn merchant(id: i64, user_id: i64, status: MerchantStatus) -> Merchant {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    Merchant {
        id,
        user_id,
        store_name: format!("Toko {id}"),
        slug: format!("toko-{id}"),
        status,
        rejection_reason: None,
        created_at: ts,
        updated_at: ts,
    }
}

pub fn wallet(merchant_id: i64, pending: i64, available: i64) -> Wallet {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    Wallet {
        id: merchant_id * 10,
        merchant_id,
        balance_pending: Rupiah::from_rupiah(pending),
        balance_available: Rupiah::from_rupiah(available),
        created_at: ts,
        updated_at: ts,
    }
}

pub fn order(id: i64, buyer_id: i64, merchant_id: i64, status: OrderStatusType) -> Order {
    let ts = Utc.with_ymd_and_hms(2024, 3, 2, 10, 30, 0).unwrap();
    let payment_status = match status {
        OrderStatusType::Pending => PaymentStatus::Unpaid,
        _ => PaymentStatus::Paid,
    };
    Order {
        id: OrderId(id),
        buyer_id,
        merchant_id,
        total_amount: Rupiah::from_rupiah(50_000),
        payment_status,
        order_status: status,
        receiver_name: "Siti".to_string(),
        receiver_phone: "08123456789".to_string(),
        shipping_address: "Jl. Merdeka 1, Bandung".to_string(),
        tracking_number: None,
        created_at: ts,
        updated_at: ts,
    }
}
