use super::dispatcher::{DispatchOutcome, DispatchRequest};
use super::worker::DispatchHandle;
use crate::domain::campaign::DeliveryStatus;
use crate::domain::ports::{ProviderLedgerRef, VoucherLedgerRef};
use crate::error::{DispatchError, Result};
use tracing::{error, info, warn};

/// Dispatch entry points that charge a credit ledger for each delivered SMS.
///
/// The ledger check happens before the send and is advisory; the actual
/// charge happens only after the worker reports a delivery. A delivered
/// message stays delivered even when the charge is refused.
#[derive(Clone)]
pub struct CreditedDispatcher {
    pool: DispatchHandle,
    provider: ProviderLedgerRef,
    vouchers: VoucherLedgerRef,
}

impl CreditedDispatcher {
    pub fn new(pool: DispatchHandle, provider: ProviderLedgerRef, vouchers: VoucherLedgerRef) -> Self {
        Self {
            pool,
            provider,
            vouchers,
        }
    }

    /// Sends against the shared provider pool.
    pub async fn dispatch_with_provider_credits(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        if !self.provider.has_sufficient_balance().await? {
            warn!(message_type = ?request.message_type, "provider credits too low, not sending");
            return Err(DispatchError::InsufficientCredits(
                "provider SMS credits are below the floor".to_string(),
            ));
        }
        self.dispatch_billed_to_provider(request).await
    }

    /// Sends and charges the provider pool without the pre-flight check.
    ///
    /// Used for the low-balance warning itself, which is sent precisely
    /// when the check would refuse.
    pub async fn dispatch_billed_to_provider(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        let message_type = request.message_type;
        let outcome = self.pool.dispatch(request).await?;
        if !outcome.delivered {
            error!(campaign = %outcome.campaign, ?message_type, "failed to send SMS from provider");
            return Err(DispatchError::DeliveryFailed {
                campaign: outcome.campaign.to_string(),
                reason: "provider did not accept the message".to_string(),
            });
        }
        match self.provider.settle(DeliveryStatus::Sent).await {
            Ok(_) => info!(campaign = %outcome.campaign, ?message_type, "SMS sent, provider credit charged"),
            Err(e) => warn!(
                campaign = %outcome.campaign,
                ?message_type,
                error = %e,
                "SMS sent but the provider pool could not be charged"
            ),
        }
        Ok(outcome)
    }

    /// Sends against a company's voucher.
    pub async fn dispatch_with_voucher(&self, company_id: u64, request: DispatchRequest) -> Result<DispatchOutcome> {
        if !self.vouchers.has_sufficient_balance(company_id).await? {
            warn!(company_id, "voucher low or expired, not sending");
            return Err(DispatchError::InsufficientCredits(format!(
                "SMS voucher for company {} is low or expired",
                company_id
            )));
        }
        let message_type = request.message_type;
        let outcome = self.pool.dispatch(request).await?;
        if !outcome.delivered {
            error!(campaign = %outcome.campaign, company_id, ?message_type, "failed to send SMS for company");
            return Err(DispatchError::DeliveryFailed {
                campaign: outcome.campaign.to_string(),
                reason: "provider did not accept the message".to_string(),
            });
        }
        match self.vouchers.settle(company_id, DeliveryStatus::Sent).await {
            Ok(_) => info!(campaign = %outcome.campaign, company_id, "SMS sent, voucher credit charged"),
            Err(e) => warn!(
                campaign = %outcome.campaign,
                company_id,
                error = %e,
                "SMS sent but the voucher could not be charged"
            ),
        }
        Ok(outcome)
    }
}
