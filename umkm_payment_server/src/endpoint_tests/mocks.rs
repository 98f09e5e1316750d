use mockall::mock;
use umkm_payment_engine::{
    db_types::{
        AuditLogEntry,
        Dispute,
        DisputeDecision,
        Merchant,
        NewAuditLogEntry,
        NewMerchant,
        NewOrder,
        NewWithdrawal,
        Order,
        OrderId,
        OrderStatusLog,
        Payment,
        Wallet,
        WalletTransaction,
        WithdrawRequest,
    },
    traits::{
        AccountApiError,
        AccountManagement,
        LedgerMovement,
        OrderPaymentOutcome,
        PaymentGatewayDatabase,
        PaymentGatewayError,
    },
};

mock! {
    pub Ledger {}

    impl Clone for Ledger {
        fn clone(&self) -> Self;
    }

    impl AccountManagement for Ledger {
        async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, AccountApiError>;
        async fn fetch_orders(&self, ids: &[OrderId]) -> Result<Vec<Order>, AccountApiError>;
        async fn fetch_orders_for_buyer(&self, buyer_id: i64) -> Result<Vec<Order>, AccountApiError>;
        async fn fetch_orders_for_merchant(&self, merchant_id: i64) -> Result<Vec<Order>, AccountApiError>;
        async fn fetch_order_status_log(&self, order_id: OrderId) -> Result<Vec<OrderStatusLog>, AccountApiError>;
        async fn fetch_payment_for_order(&self, order_id: OrderId) -> Result<Option<Payment>, AccountApiError>;
        async fn fetch_merchant(&self, merchant_id: i64) -> Result<Option<Merchant>, AccountApiError>;
        async fn fetch_merchant_for_user(&self, user_id: i64) -> Result<Option<Merchant>, AccountApiError>;
        async fn fetch_pending_merchants(&self) -> Result<Vec<Merchant>, AccountApiError>;
        async fn fetch_wallet_for_merchant(&self, merchant_id: i64) -> Result<Option<Wallet>, AccountApiError>;
        async fn fetch_wallet_transactions(&self, wallet_id: i64) -> Result<Vec<WalletTransaction>, AccountApiError>;
        async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, AccountApiError>;
        async fn fetch_open_disputes(&self) -> Result<Vec<Dispute>, AccountApiError>;
        async fn fetch_withdrawals_for_merchant(&self, merchant_id: i64) -> Result<Vec<WithdrawRequest>, AccountApiError>;
        async fn fetch_audit_logs(&self, limit: i64) -> Result<Vec<AuditLogEntry>, AccountApiError>;
    }

    impl PaymentGatewayDatabase for Ledger {
        fn url(&self) -> &str;
        async fn insert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, PaymentGatewayError>;
        async fn approve_merchant(&self, merchant_id: i64) -> Result<(Merchant, Wallet), PaymentGatewayError>;
        async fn reject_merchant(&self, merchant_id: i64, reason: &str) -> Result<Merchant, PaymentGatewayError>;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;
        async fn apply_settlement(&self, order_id: OrderId, transaction_id: &str) -> Result<OrderPaymentOutcome, PaymentGatewayError>;
        async fn apply_payment_failure(&self, order_id: OrderId) -> Result<OrderPaymentOutcome, PaymentGatewayError>;
        async fn ship_order(&self, merchant_id: i64, order_id: OrderId, tracking_number: Option<String>) -> Result<Order, PaymentGatewayError>;
        async fn complete_order(&self, buyer_id: i64, order_id: OrderId) -> Result<LedgerMovement, PaymentGatewayError>;
        async fn open_dispute(&self, buyer_id: i64, order_id: OrderId, reason: &str) -> Result<Dispute, PaymentGatewayError>;
        async fn resolve_dispute(&self, dispute_id: i64, decision: DisputeDecision) -> Result<(Dispute, LedgerMovement), PaymentGatewayError>;
        async fn request_withdrawal(&self, merchant_id: i64, withdrawal: NewWithdrawal) -> Result<(WithdrawRequest, Wallet), PaymentGatewayError>;
        async fn insert_audit_log(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, PaymentGatewayError>;
    }
}
