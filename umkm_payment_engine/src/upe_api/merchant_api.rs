use std::fmt::Debug;

use log::*;
use serde_json::json;

use crate::{
    db_types::{Merchant, Wallet},
    events::{AdminActionEvent, EventProducers},
    traits::{AccountApiError, PaymentGatewayDatabase, PaymentGatewayError},
};

/// Admin review of merchant (UMKM) registrations.
pub struct MerchantApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for MerchantApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantApi")
    }
}

impl<B> MerchantApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> MerchantApi<B>
where B: PaymentGatewayDatabase
{
    /// Approves a pending merchant and opens its wallet.
    pub async fn approve(&self, admin_id: i64, merchant_id: i64) -> Result<(Merchant, Wallet), PaymentGatewayError> {
        let (merchant, wallet) = self.db.approve_merchant(merchant_id).await?;
        info!("🔄️🏪️ Admin #{admin_id} approved merchant #{merchant_id} ({})", merchant.store_name);
        let audit = AdminActionEvent::new(admin_id, "APPROVE_UMKM", "UMKM", merchant_id)
            .with_metadata(json!({ "wallet_id": wallet.id }));
        self.producers.publish_admin_action(audit).await;
        Ok((merchant, wallet))
    }

    pub async fn reject(&self, admin_id: i64, merchant_id: i64, reason: &str) -> Result<Merchant, PaymentGatewayError> {
        let merchant = self.db.reject_merchant(merchant_id, reason.trim()).await?;
        info!("🔄️🏪️ Admin #{admin_id} rejected merchant #{merchant_id}");
        let audit = AdminActionEvent::new(admin_id, "REJECT_UMKM", "UMKM", merchant_id)
            .with_metadata(json!({ "reason": reason.trim() }));
        self.producers.publish_admin_action(audit).await;
        Ok(merchant)
    }

    pub async fn pending_merchants(&self) -> Result<Vec<Merchant>, AccountApiError> {
        self.db.fetch_pending_merchants().await
    }
}
