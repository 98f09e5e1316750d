use umkm_payment_engine::{
    db_types::{Merchant, NewMerchant, NewOrder, Order, Rupiah, Wallet},
    events::EventProducers,
    helpers::callback_signature,
    AccountApi,
    AccountManagement,
    GatewayCallback,
    PaymentGatewayDatabase,
    ReconciliationApi,
    SqliteDatabase,
    WalletHistory,
};
use umkm_common::Secret;

pub const SERVER_KEY: &str = "SB-Mid-server-test-key";

pub fn rp(rupiah: i64) -> Rupiah {
    Rupiah::from_rupiah(rupiah)
}

/// Registers a merchant for `user_id` and approves it.
pub async fn active_merchant(db: &SqliteDatabase, user_id: i64) -> (Merchant, Wallet) {
    let merchant = db.insert_merchant(NewMerchant::new(user_id, &format!("Toko {user_id}"))).await.unwrap();
    db.approve_merchant(merchant.id).await.unwrap()
}

pub async fn new_order(db: &SqliteDatabase, buyer_id: i64, merchant_id: i64, total: i64) -> Order {
    let order = NewOrder::new(buyer_id, merchant_id, rp(total)).with_shipping("Siti", "08123456789", "Jl. Merdeka 1");
    db.insert_order(order).await.unwrap()
}

pub fn callback(trx: &str, status: &str, orders: &[&Order], gross: &str) -> GatewayCallback {
    let ids = orders.iter().map(|o| o.id.value().to_string()).collect::<Vec<_>>().join(",");
    signed_callback(trx, status, Some(format!("[{ids}]")), gross)
}

pub fn signed_callback(trx: &str, status: &str, custom_field1: Option<String>, gross: &str) -> GatewayCallback {
    GatewayCallback {
        order_id: trx.to_string(),
        status_code: "200".to_string(),
        gross_amount: gross.to_string(),
        signature_key: callback_signature(trx, "200", gross, SERVER_KEY),
        transaction_status: status.to_string(),
        fraud_status: None,
        custom_field1,
    }
}

pub fn reconciliation_api(db: &SqliteDatabase, producers: EventProducers) -> ReconciliationApi<SqliteDatabase> {
    ReconciliationApi::new(db.clone(), producers, Secret::new(SERVER_KEY.to_string()))
}

/// Pays for the order through a settlement callback.
pub async fn pay(db: &SqliteDatabase, order: &Order) -> Order {
    let api = reconciliation_api(db, EventProducers::default());
    let trx = format!("TRX-{}", order.id.value());
    let gross = order.total_amount.to_string();
    let report = api.process_callback(&callback(&trx, "settlement", &[order], &gross)).await.unwrap();
    assert_eq!(report.credited(), 1);
    db.fetch_order(order.id).await.unwrap().unwrap()
}

pub async fn wallet_history(db: &SqliteDatabase, merchant_id: i64) -> WalletHistory {
    AccountApi::new(db.clone()).wallet_history(merchant_id).await.unwrap().unwrap()
}

/// Balances are never negative and the ledger accounts for every unit in the wallet.
pub async fn assert_ledger_consistent(db: &SqliteDatabase, merchant_id: i64) {
    let history = wallet_history(db, merchant_id).await;
    assert!(!history.wallet.balance_pending.is_negative());
    assert!(!history.wallet.balance_available.is_negative());
    let (pending, available) = history.ledger_balances();
    assert!(
        history.is_consistent(),
        "ledger replays to {pending} pending / {available} available, but the wallet holds {} / {}",
        history.wallet.balance_pending,
        history.wallet.balance_available
    );
}
