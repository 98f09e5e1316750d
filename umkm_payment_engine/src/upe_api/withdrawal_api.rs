use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{MerchantStatus, NewWithdrawal, Rupiah, Wallet, WithdrawRequest},
    events::{EventProducers, WithdrawalRequestedEvent},
    traits::{PaymentGatewayDatabase, PaymentGatewayError},
};

/// Rp 10.000, in sen
pub const DEFAULT_MINIMUM_WITHDRAWAL: i64 = 1_000_000;

/// Reserves a merchant's available balance for a payout. The payout itself, and approval of the request, happen
/// outside the ledger.
pub struct WithdrawalApi<B> {
    db: B,
    producers: EventProducers,
    minimum: Rupiah,
}

impl<B> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi (minimum {})", self.minimum)
    }
}

impl<B> WithdrawalApi<B> {
    pub fn new(db: B, producers: EventProducers, minimum: Rupiah) -> Self {
        Self { db, producers, minimum }
    }
}

impl<B> WithdrawalApi<B>
where B: PaymentGatewayDatabase
{
    /// Requests a withdrawal of `withdrawal.amount` from the merchant's available balance.
    ///
    /// Fails with `BelowMinimumWithdrawal` if the amount is below the configured minimum, and with
    /// `InsufficientBalance` if it exceeds the available balance. Neither failure changes any state.
    pub async fn request_withdrawal(
        &self,
        merchant_id: i64,
        withdrawal: NewWithdrawal,
    ) -> Result<(WithdrawRequest, Wallet), PaymentGatewayError> {
        if withdrawal.amount < self.minimum {
            return Err(PaymentGatewayError::BelowMinimumWithdrawal {
                requested: withdrawal.amount,
                minimum: self.minimum,
            });
        }
        if withdrawal.bank_name.trim().is_empty() || withdrawal.bank_account.trim().is_empty() {
            return Err(PaymentGatewayError::PreconditionFailed("Bank name and account are required".to_string()));
        }
        let merchant =
            self.db.fetch_merchant(merchant_id).await?.ok_or(PaymentGatewayError::MerchantNotFound(merchant_id))?;
        if merchant.status != MerchantStatus::Active {
            return Err(PaymentGatewayError::PreconditionFailed(format!(
                "Merchant #{merchant_id} is {} and cannot withdraw funds",
                merchant.status
            )));
        }
        let amount = withdrawal.amount;
        let (request, wallet) = self.db.request_withdrawal(merchant_id, withdrawal).await?;
        info!("🔄️🏦️ Merchant #{merchant_id} requested a withdrawal of {amount} (request #{})", request.id);
        self.producers.publish_withdrawal_requested(WithdrawalRequestedEvent { request: request.clone() }).await;
        Ok((request, wallet))
    }
}
