use super::campaign::{Campaign, CampaignId, DeliveryStatus, Notification};
use super::delivery::DeliveryResult;
use super::ledger::{Credits, ProviderCreditPool, SmsPackage, TenantVoucher};
use super::party::CompanyProfile;
use super::template::{Locale, MessageType, Template};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn find(&self, message_type: MessageType, locale: Locale) -> Result<Option<Template>>;
    async fn store(&self, template: Template) -> Result<()>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn store(&self, campaign: Campaign) -> Result<()>;
    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>>;
    async fn get_all(&self) -> Result<Vec<Campaign>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn store(&self, notification: Notification) -> Result<()>;
    async fn for_campaign(&self, campaign: CampaignId) -> Result<Option<Notification>>;
    async fn get_all(&self) -> Result<Vec<Notification>>;
}

#[async_trait]
pub trait CreditPoolStore: Send + Sync {
    async fn get(&self) -> Result<Option<ProviderCreditPool>>;
    async fn store(&self, pool: ProviderCreditPool) -> Result<()>;
}

#[async_trait]
pub trait VoucherStore: Send + Sync {
    async fn get(&self, company_id: u64) -> Result<Option<TenantVoucher>>;
    async fn store(&self, voucher: TenantVoucher) -> Result<()>;
}

/// Transport to the upstream SMS gateway.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// `phone_number` is already in international form.
    async fn send(&self, phone_number: &str, message: &str) -> DeliveryResult;
    async fn fetch_balance(&self) -> Result<Credits>;
}

/// Spend tracking against the shared upstream account.
#[async_trait]
pub trait ProviderLedger: Send + Sync {
    async fn has_sufficient_balance(&self) -> Result<bool>;
    async fn settle(&self, outcome: DeliveryStatus) -> Result<()>;
    async fn balance(&self) -> Result<Option<ProviderCreditPool>>;
    /// Overwrites the pool with a balance observed upstream, creating it if needed.
    async fn resync(&self, observed: Credits) -> Result<ProviderCreditPool>;
}

/// Spend tracking against per-company vouchers.
#[async_trait]
pub trait VoucherLedger: Send + Sync {
    async fn has_sufficient_balance(&self, company_id: u64) -> Result<bool>;
    async fn settle(&self, company_id: u64, outcome: DeliveryStatus) -> Result<()>;
    async fn balance(&self, company_id: u64) -> Result<Option<TenantVoucher>>;
    async fn refill(&self, company: CompanyProfile, package: SmsPackage) -> Result<TenantVoucher>;
}

pub type TemplateStoreBox = Box<dyn TemplateStore>;
pub type CampaignStoreBox = Box<dyn CampaignStore>;
pub type NotificationStoreBox = Box<dyn NotificationStore>;
pub type CreditPoolStoreBox = Box<dyn CreditPoolStore>;
pub type VoucherStoreBox = Box<dyn VoucherStore>;
pub type SmsGatewayRef = Arc<dyn SmsGateway>;
pub type ProviderLedgerRef = Arc<dyn ProviderLedger>;
pub type VoucherLedgerRef = Arc<dyn VoucherLedger>;
